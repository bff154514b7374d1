use std::sync::Arc;

use sqlx::SqlitePool;

use crate::billing::BillingClient;
use crate::identity::IdentityClient;
use crate::services::ReminderService;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub billing: Arc<dyn BillingClient>,
    pub identity: Arc<dyn IdentityClient>,
    pub reminders: Arc<ReminderService>,
    pub admin_email: String,
}
