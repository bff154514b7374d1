pub mod dto;

use std::env;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reqwest::Client;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct IdentityConfig {
    pub api_key: String,
    pub api_url: String,
}

impl IdentityConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_key = env::var("IDENTITY_API_KEY")
            .map_err(|_| AppError::BadRequest("IDENTITY_API_KEY is not set".to_string()))?;
        let api_url = env::var("IDENTITY_API_URL")
            .unwrap_or_else(|_| "https://api.clerk.com/v1".to_string());

        Ok(Self { api_key, api_url })
    }
}

/// Profile fields the identity provider holds for a subscriber. The id
/// itself stays opaque; we never look inside it.
#[derive(Clone, Debug)]
pub struct UserProfile {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, AppError>;
}

pub struct IdentityHttpClient {
    client: Client,
    config: IdentityConfig,
}

impl IdentityHttpClient {
    pub fn new(config: IdentityConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl IdentityClient for IdentityHttpClient {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        let url = format!("{}/users/{}", self.config.api_url, user_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!(
                "Identity API error {}: {}",
                status, body
            )));
        }

        let user: dto::IdentityUser = response.json().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to parse identity response: {}", e))
        })?;

        Ok(user.into_profile())
    }
}

/// Used when no identity credentials are configured, and in tests. Knows
/// nobody, so ensure-user falls back to already-stored rows.
pub struct NoopIdentityClient;

#[async_trait]
impl IdentityClient for NoopIdentityClient {
    async fn fetch_profile(&self, _user_id: &str) -> Result<UserProfile, AppError> {
        Err(AppError::NotFound)
    }
}

/// Opaque subscriber id for the authenticated request, taken from the
/// `x-user-id` header the identity-aware proxy sets after session
/// verification. Requests without it are rejected with 401.
#[derive(Clone, Debug)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty())
            .map(|id| AuthUser(id.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}
