use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_key: String,
    pub from: String,
}

impl EmailConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_key = env::var("RESEND_API_KEY")
            .map_err(|_| AppError::BadRequest("RESEND_API_KEY is not set".to_string()))?;
        let from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Compliance Buddy <noreply@compliancebuddy.com>".to_string());

        Ok(Self { api_key, from })
    }
}

/// Transactional email dispatch. Success means the provider accepted the
/// message; delivery retries inside the transport are the provider's
/// concern, not ours.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError>;
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub struct ResendHttpClient {
    client: Client,
    config: EmailConfig,
}

impl ResendHttpClient {
    pub fn new(config: EmailConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmailClient for ResendHttpClient {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), AppError> {
        let request_body = SendEmailRequest {
            from: &self.config.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Email API error {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Accepts every message without dispatching anything. Used when no email
/// credentials are configured, and in tests.
pub struct NoopEmailClient;

#[async_trait]
impl EmailClient for NoopEmailClient {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> Result<(), AppError> {
        Ok(())
    }
}
