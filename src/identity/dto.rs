use serde::Deserialize;

use super::UserProfile;

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl IdentityUser {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            email: self
                .email_addresses
                .into_iter()
                .next()
                .map(|e| e.email_address)
                .unwrap_or_default(),
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

/// Identity provider webhook envelope; signatures are verified upstream.
#[derive(Debug, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: IdentityUser,
}
