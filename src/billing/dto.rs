use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub url: Option<String>,
}

/// Provider webhook event envelope. Signature verification happens at the
/// ingress before the payload reaches us.
#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: BillingEventData,
}

#[derive(Debug, Deserialize)]
pub struct BillingEventData {
    pub object: BillingObject,
}

/// Union of the object fields we read across event types; everything else
/// in the provider payload is ignored.
#[derive(Debug, Deserialize)]
pub struct BillingObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}
