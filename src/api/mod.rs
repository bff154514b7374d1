use axum::Json;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Router, http::StatusCode};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::billing::dto::BillingEvent;
use crate::db::repository;
use crate::error::AppError;
use crate::identity::AuthUser;
use crate::identity::dto::IdentityEvent;
use crate::models::*;
use crate::services::{ChecklistService, ReminderStats};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/user", get(get_user))
        .route("/checklists", get(list_checklists).post(create_checklist))
        .route(
            "/checklists/{id}",
            patch(update_checklist_task).delete(delete_checklist),
        )
        .route("/admin/templates", get(list_templates).post(create_template))
        .route(
            "/admin/templates/{id}",
            patch(update_template).delete(delete_template),
        )
        .route(
            "/payments/create-checkout-session",
            post(create_checkout_session),
        )
        .route("/payments/cancel-subscription", post(cancel_subscription))
        .route("/webhooks/billing", post(billing_webhook))
        .route("/webhooks/identity", post(identity_webhook))
        .route("/cron/send-reminders", post(send_reminders))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

/// Looks up the local user row, creating it from the identity provider's
/// profile on first contact. Provider failures are swallowed so a flaky
/// identity API never blocks reads of already-known users.
async fn ensure_user_exists(
    state: &AppState,
    user_id: &str,
) -> Result<Option<User>, AppError> {
    if let Some(user) = repository::find_user(&state.db, user_id).await? {
        return Ok(Some(user));
    }

    match state.identity.fetch_profile(user_id).await {
        Ok(profile) => {
            let user = repository::insert_user(
                &state.db,
                NewUser {
                    user_id: user_id.to_string(),
                    email: profile.email,
                    first_name: profile.first_name,
                    last_name: profile.last_name,
                },
            )
            .await?;
            info!("User created from identity profile: {}", user_id);
            Ok(Some(user))
        }
        Err(e) => {
            warn!("Failed to fetch identity profile for {}: {}", user_id, e);
            Ok(None)
        }
    }
}

async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, AppError> {
    let user = ensure_user_exists(&state, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user))
}

async fn list_checklists(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Checklist>>, AppError> {
    ensure_user_exists(&state, &user_id).await?;
    let checklists = repository::fetch_checklists(&state.db, &user_id).await?;
    Ok(Json(checklists))
}

async fn create_checklist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<NewChecklistRequest>,
) -> Result<Json<Checklist>, AppError> {
    let user = ensure_user_exists(&state, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let service = ChecklistService::new(state.db.clone());
    let checklist = service
        .create_for_user(&user, &req.city, &req.business_type, Utc::now())
        .await?;
    Ok(Json(checklist))
}

async fn update_checklist_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Checklist>, AppError> {
    let mut checklist = repository::find_checklist(&state.db, &id, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let task = checklist
        .tasks
        .get_mut(req.task_index)
        .ok_or_else(|| AppError::BadRequest("Task index out of range".to_string()))?;
    task.completed = req.completed;

    repository::update_checklist_tasks(&state.db, &id, &checklist.tasks).await?;
    Ok(Json(checklist))
}

async fn delete_checklist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let ok = repository::delete_checklist(&state.db, &id, &user_id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn require_admin(state: &AppState, user_id: &str) -> Result<User, AppError> {
    match repository::find_user(&state.db, user_id).await? {
        Some(user) if user.email == state.admin_email => Ok(user),
        _ => Err(AppError::Forbidden("Admin access required".to_string())),
    }
}

async fn list_templates(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ChecklistTemplate>>, AppError> {
    require_admin(&state, &user_id).await?;
    let templates = repository::fetch_templates(&state.db).await?;
    Ok(Json(templates))
}

async fn create_template(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TemplateRequest>,
) -> Result<Json<ChecklistTemplate>, AppError> {
    require_admin(&state, &user_id).await?;
    let template = repository::insert_template(&state.db, req).await?;
    Ok(Json(template))
}

async fn update_template(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<TemplateRequest>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &user_id).await?;
    let ok = repository::update_template(&state.db, &id, req).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn delete_template(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &user_id).await?;
    let ok = repository::delete_template(&state.db, &id).await?;
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

#[derive(Debug, Serialize)]
struct CheckoutSessionResponse {
    url: String,
}

async fn create_checkout_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let user = repository::find_user(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let url = state
        .billing
        .create_checkout_session(&user.email, &user.user_id)
        .await?;
    Ok(Json(CheckoutSessionResponse { url }))
}

async fn cancel_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, AppError> {
    let user = repository::find_user(&state.db, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let subscription_id = user.subscription_id.ok_or(AppError::NotFound)?;

    state.billing.cancel_subscription(&subscription_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn billing_webhook(
    State(state): State<AppState>,
    Json(event): Json<BillingEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let object = event.data.object;
            if let Some(user_id) = object.metadata.as_ref().and_then(|m| m.get("userId")) {
                repository::set_subscription_paid(
                    &state.db,
                    user_id,
                    object.customer.as_deref().unwrap_or_default(),
                    object.subscription.as_deref().unwrap_or_default(),
                )
                .await?;
                info!("Subscription activated for user: {}", user_id);
            }
        }
        "customer.subscription.deleted" => {
            if let Some(subscription_id) = event.data.object.id.as_deref() {
                repository::clear_subscription(&state.db, subscription_id).await?;
                info!("Subscription cancelled: {}", subscription_id);
            }
        }
        "invoice.payment_failed" => {
            warn!(
                "Payment failed for subscription: {:?}",
                event.data.object.subscription
            );
        }
        other => {
            debug!("Unhandled billing event type: {}", other);
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

async fn identity_webhook(
    State(state): State<AppState>,
    Json(event): Json<IdentityEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = event.data.id.clone();

    match event.event_type.as_str() {
        "user.created" => {
            if repository::find_user(&state.db, &user_id).await?.is_none() {
                let profile = event.data.into_profile();
                repository::insert_user(
                    &state.db,
                    NewUser {
                        user_id: user_id.clone(),
                        email: profile.email,
                        first_name: profile.first_name,
                        last_name: profile.last_name,
                    },
                )
                .await?;
                info!("User created: {}", user_id);
            }
        }
        "user.updated" => {
            let profile = event.data.into_profile();
            repository::update_user_profile(
                &state.db,
                &user_id,
                &profile.email,
                profile.first_name.as_deref(),
                profile.last_name.as_deref(),
            )
            .await?;
            info!("User updated: {}", user_id);
        }
        "user.deleted" => {
            repository::delete_user_data(&state.db, &user_id).await?;
            info!("User deleted: {}", user_id);
        }
        other => {
            debug!("Unhandled identity event type: {}", other);
        }
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn send_reminders(
    State(state): State<AppState>,
) -> Result<Json<ReminderStats>, AppError> {
    let stats = state.reminders.run().await?;
    Ok(Json(stats))
}
