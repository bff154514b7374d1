use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use compliance_backend::email::NoopEmailClient;
use compliance_backend::services::{ReminderScheduler, ReminderService};

#[tokio::test]
async fn test_scheduler_initialization() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    let service = Arc::new(ReminderService::new(
        pool,
        Arc::new(NoopEmailClient),
        "http://localhost:3000".to_string(),
    ));

    let _scheduler = ReminderScheduler::new(service, 10);
}

#[tokio::test]
async fn test_scheduler_short_interval() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let service = Arc::new(ReminderService::new(
        pool,
        Arc::new(NoopEmailClient),
        "http://localhost:3000".to_string(),
    ));

    let scheduler = ReminderScheduler::new(service, 1);

    let scheduler_task = tokio::spawn(async move {
        scheduler.start().await;
    });

    // Let a couple of empty passes run, then shut the loop down.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler_task.abort();
}
