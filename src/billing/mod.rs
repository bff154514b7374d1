pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct BillingConfig {
    pub secret_key: String,
    pub price_id: String,
    pub app_url: String,
}

impl BillingConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| AppError::BadRequest("STRIPE_SECRET_KEY is not set".to_string()))?;
        let price_id = env::var("STRIPE_PRICE_ID")
            .map_err(|_| AppError::BadRequest("STRIPE_PRICE_ID is not set".to_string()))?;
        let app_url =
            env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            secret_key,
            price_id,
            app_url,
        })
    }
}

/// Billing provider operations the backend invokes. Subscription state
/// itself flows back through the provider's webhook, not these calls.
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Starts a subscription checkout and returns the hosted payment URL.
    async fn create_checkout_session(
        &self,
        customer_email: &str,
        user_id: &str,
    ) -> Result<String, AppError>;

    /// Asks the provider to end the subscription at the current period end.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AppError>;
}

pub struct StripeHttpClient {
    client: Client,
    config: BillingConfig,
}

impl StripeHttpClient {
    pub fn new(config: BillingConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl BillingClient for StripeHttpClient {
    async fn create_checkout_session(
        &self,
        customer_email: &str,
        user_id: &str,
    ) -> Result<String, AppError> {
        let success_url = format!("{}/settings?tab=billing&success=true", self.config.app_url);
        let cancel_url = format!("{}/settings?tab=billing", self.config.app_url);

        let params = [
            ("customer_email", customer_email),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", self.config.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("mode", "subscription"),
            ("success_url", success_url.as_str()),
            ("cancel_url", cancel_url.as_str()),
            ("metadata[userId]", user_id),
        ];

        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Billing API error {}: {}",
                status, body
            )));
        }

        let session: dto::CheckoutSession = response
            .json()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to parse billing response: {}", e)))?;

        session.url.ok_or_else(|| {
            AppError::BadRequest("Billing provider returned no checkout URL".to_string())
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AppError> {
        let url = format!("https://api.stripe.com/v1/subscriptions/{}", subscription_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&[("cancel_at_period_end", "true")])
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Billing API error {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Stand-in used when no billing credentials are configured, and in tests.
pub struct NoopBillingClient;

#[async_trait]
impl BillingClient for NoopBillingClient {
    async fn create_checkout_session(
        &self,
        _customer_email: &str,
        _user_id: &str,
    ) -> Result<String, AppError> {
        Err(AppError::BadRequest(
            "Billing is not configured".to_string(),
        ))
    }

    async fn cancel_subscription(&self, _subscription_id: &str) -> Result<(), AppError> {
        Err(AppError::BadRequest(
            "Billing is not configured".to_string(),
        ))
    }
}
