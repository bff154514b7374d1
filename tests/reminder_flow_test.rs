use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use sqlx::SqlitePool;

use compliance_backend::db::repository;
use compliance_backend::email::EmailClient;
use compliance_backend::error::AppError;
use compliance_backend::models::{NewUser, SubscriptionTier, TemplateRequest, TemplateTask, User};
use compliance_backend::services::{ChecklistService, ReminderService};

/// Records accepted messages; flips to failure mode on demand to simulate a
/// provider outage.
struct MockEmailClient {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl MockEmailClient {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailClient for MockEmailClient {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::BadRequest(
                "Email API error 500: simulated outage".to_string(),
            ));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn insert_paid_user(pool: &SqlitePool, user_id: &str) -> User {
    repository::insert_user(
        pool,
        NewUser {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            first_name: Some("Alex".to_string()),
            last_name: Some("Rivera".to_string()),
        },
    )
    .await
    .expect("Failed to insert user");
    repository::set_subscription_paid(pool, user_id, "cus_test", "sub_test")
        .await
        .expect("Failed to upgrade user");

    repository::find_user(pool, user_id)
        .await
        .expect("Failed to fetch user")
        .expect("User missing after insert")
}

async fn insert_nyc_template(pool: &SqlitePool) {
    let req = TemplateRequest {
        city: "NYC".to_string(),
        business_type: "Food Truck".to_string(),
        tasks: vec![
            TemplateTask {
                task: "Mobile Food Vendor License".to_string(),
                renewal: "Annual".to_string(),
            },
            TemplateTask {
                task: "Sales Tax Registration".to_string(),
                renewal: "N/A".to_string(),
            },
        ],
    };
    repository::insert_template(pool, req)
        .await
        .expect("Failed to insert template");
}

#[tokio::test]
async fn test_annual_checklist_sends_one_reminder_in_window() {
    let pool = setup_test_db().await;
    let user = insert_paid_user(&pool, "user_paid").await;
    insert_nyc_template(&pool).await;

    let t0 = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();

    let checklist = ChecklistService::new(pool.clone())
        .create_for_user(&user, "NYC", "Food Truck", t0)
        .await
        .expect("Failed to create checklist");

    // The annual task gets t0 + 365 days, the unparseable one gets nothing.
    assert_eq!(checklist.tasks.len(), 2);
    assert_eq!(checklist.tasks[0].due_date, Some(t0 + Duration::days(365)));
    assert_eq!(checklist.tasks[1].due_date, None);
    assert!(!checklist.tasks[0].completed);

    // One reminder, unsent, carrying the sibling task's due date.
    let reminders = repository::fetch_reminders_for_checklist(&pool, &checklist.id)
        .await
        .expect("Failed to fetch reminders");
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].task_name, "Mobile Food Vendor License");
    assert_eq!(reminders[0].due_date, t0 + Duration::days(365));
    assert!(!reminders[0].sent);

    let email = Arc::new(MockEmailClient::new());
    let service = ReminderService::new(
        pool.clone(),
        email.clone(),
        "http://localhost:3000".to_string(),
    );

    // 25 days out: inside the window, so exactly one email goes out.
    let stats = service
        .process_due(t0 + Duration::days(340))
        .await
        .expect("Evaluator failed");
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(email.sent_count(), 1);
    {
        let sent = email.sent.lock().unwrap();
        assert_eq!(sent[0].0, "user_paid@example.com");
        assert_eq!(
            sent[0].1,
            "Reminder: Mobile Food Vendor License due in 25 days"
        );
    }

    let reminders = repository::fetch_reminders_for_checklist(&pool, &checklist.id)
        .await
        .expect("Failed to fetch reminders");
    assert!(reminders[0].sent);

    // Second pass a day later: nothing left to send.
    let stats = service
        .process_due(t0 + Duration::days(341))
        .await
        .expect("Evaluator failed");
    assert_eq!(stats.loaded, 0);
    assert_eq!(stats.sent, 0);
    assert_eq!(email.sent_count(), 1);
}

#[tokio::test]
async fn test_dispatch_failure_leaves_reminder_pending_for_retry() {
    let pool = setup_test_db().await;
    let user = insert_paid_user(&pool, "user_retry").await;
    insert_nyc_template(&pool).await;

    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    let checklist = ChecklistService::new(pool.clone())
        .create_for_user(&user, "NYC", "Food Truck", t0)
        .await
        .expect("Failed to create checklist");

    let email = Arc::new(MockEmailClient::new());
    let service = ReminderService::new(
        pool.clone(),
        email.clone(),
        "http://localhost:3000".to_string(),
    );

    email.fail.store(true, Ordering::SeqCst);
    let stats = service
        .process_due(t0 + Duration::days(350))
        .await
        .expect("Evaluator failed");
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.sent, 0);

    let reminders = repository::fetch_reminders_for_checklist(&pool, &checklist.id)
        .await
        .expect("Failed to fetch reminders");
    assert!(!reminders[0].sent);

    // The provider recovers; the next invocation picks the reminder up again.
    email.fail.store(false, Ordering::SeqCst);
    let stats = service
        .process_due(t0 + Duration::days(351))
        .await
        .expect("Evaluator failed");
    assert_eq!(stats.sent, 1);
    assert_eq!(email.sent_count(), 1);
}

#[tokio::test]
async fn test_overdue_reminder_is_never_sent() {
    let pool = setup_test_db().await;
    let user = insert_paid_user(&pool, "user_late").await;
    insert_nyc_template(&pool).await;

    let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    ChecklistService::new(pool.clone())
        .create_for_user(&user, "NYC", "Food Truck", t0)
        .await
        .expect("Failed to create checklist");

    let email = Arc::new(MockEmailClient::new());
    let service = ReminderService::new(
        pool.clone(),
        email.clone(),
        "http://localhost:3000".to_string(),
    );

    // Five days past due: the pre-filter still loads it, the window check
    // drops it, and it stays pending with no backlog flush.
    let stats = service
        .process_due(t0 + Duration::days(370))
        .await
        .expect("Evaluator failed");
    assert_eq!(stats.loaded, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.sent, 0);
    assert_eq!(email.sent_count(), 0);
}

#[tokio::test]
async fn test_free_subscribers_get_no_reminders_and_one_checklist() {
    let pool = setup_test_db().await;
    repository::insert_user(
        &pool,
        NewUser {
            user_id: "user_free".to_string(),
            email: "user_free@example.com".to_string(),
            first_name: None,
            last_name: None,
        },
    )
    .await
    .expect("Failed to insert user");
    let user = repository::find_user(&pool, "user_free")
        .await
        .expect("Failed to fetch user")
        .expect("User missing");
    assert_eq!(user.subscription, SubscriptionTier::Free);
    insert_nyc_template(&pool).await;

    let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
    let service = ChecklistService::new(pool.clone());
    let checklist = service
        .create_for_user(&user, "NYC", "Food Truck", t0)
        .await
        .expect("Failed to create checklist");

    // Due dates are still derived; only the reminder fan-out is gated.
    assert_eq!(checklist.tasks[0].due_date, Some(t0 + Duration::days(365)));
    let reminders = repository::fetch_reminders_for_checklist(&pool, &checklist.id)
        .await
        .expect("Failed to fetch reminders");
    assert!(reminders.is_empty());

    // One checklist is the free-plan ceiling.
    let err = service
        .create_for_user(&user, "NYC", "Food Truck", t0)
        .await
        .expect_err("Second checklist should be rejected");
    assert!(matches!(err, AppError::Forbidden(_)));
}
