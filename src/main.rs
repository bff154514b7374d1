use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use compliance_backend::api::router;
use compliance_backend::billing::{BillingClient, BillingConfig, NoopBillingClient, StripeHttpClient};
use compliance_backend::email::{EmailClient, EmailConfig, NoopEmailClient, ResendHttpClient};
use compliance_backend::identity::{
    IdentityClient, IdentityConfig, IdentityHttpClient, NoopIdentityClient,
};
use compliance_backend::services::{ReminderScheduler, ReminderService};
use compliance_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "compliance_backend=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://compliance.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_url =
        std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let admin_email = std::env::var("ADMIN_EMAIL")
        .unwrap_or_else(|_| "admin@compliancebuddy.com".to_string());

    // Each vendor degrades to its no-op client when unconfigured so a local
    // instance can come up with just a database.
    let email: Arc<dyn EmailClient> = match EmailConfig::new_from_env() {
        Ok(config) => Arc::new(ResendHttpClient::new(config)?),
        Err(e) => {
            warn!("Email dispatch disabled: {}", e);
            Arc::new(NoopEmailClient)
        }
    };
    let billing: Arc<dyn BillingClient> = match BillingConfig::new_from_env() {
        Ok(config) => Arc::new(StripeHttpClient::new(config)?),
        Err(e) => {
            warn!("Billing disabled: {}", e);
            Arc::new(NoopBillingClient)
        }
    };
    let identity: Arc<dyn IdentityClient> = match IdentityConfig::new_from_env() {
        Ok(config) => Arc::new(IdentityHttpClient::new(config)?),
        Err(e) => {
            warn!("Identity profile lookup disabled: {}", e);
            Arc::new(NoopIdentityClient)
        }
    };

    let reminders = Arc::new(ReminderService::new(
        pool.clone(),
        email,
        app_url,
    ));

    let interval_secs = std::env::var("REMINDER_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(86_400);
    tokio::spawn(ReminderScheduler::new(reminders.clone(), interval_secs).start());

    let state = AppState {
        db: pool.clone(),
        billing,
        identity,
        reminders,
        admin_email,
    };

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
