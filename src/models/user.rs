use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Entitlement tier supplied by the billing provider. Reminder delivery is
/// gated on `Paid`; nothing else in the core depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Paid,
}

impl SubscriptionTier {
    pub fn grants_reminders(self) -> bool {
        matches!(self, SubscriptionTier::Paid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque subscriber id issued by the identity provider.
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub subscription: SubscriptionTier,
    pub stripe_customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
