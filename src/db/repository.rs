use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Checklist, ChecklistTask, ChecklistTemplate, NewUser, Reminder, SubscriptionTier,
    TemplateRequest, User,
};

// ---- users ----

pub async fn find_user(db: &SqlitePool, user_id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, email, first_name, last_name, subscription, stripe_customer_id, subscription_id, created_at, updated_at FROM users WHERE user_id = ?"
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(user)
}

pub async fn insert_user(db: &SqlitePool, new: NewUser) -> Result<User, AppError> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users
            (user_id, email, first_name, last_name, subscription,
            stripe_customer_id, subscription_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, 'free', NULL, NULL, ?5, ?5)
        "#,
    )
    .bind(&new.user_id)
    .bind(&new.email)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(User {
        user_id: new.user_id,
        email: new.email,
        first_name: new.first_name,
        last_name: new.last_name,
        subscription: SubscriptionTier::Free,
        stripe_customer_id: None,
        subscription_id: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn update_user_profile(
    db: &SqlitePool,
    user_id: &str,
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<bool, AppError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, updated_at = ?4 WHERE user_id = ?5"
    )
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(&now)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_subscription_paid(
    db: &SqlitePool,
    user_id: &str,
    stripe_customer_id: &str,
    subscription_id: &str,
) -> Result<bool, AppError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE users
        SET subscription = 'paid',
            stripe_customer_id = ?1,
            subscription_id = ?2,
            updated_at = ?3
        WHERE user_id = ?4
        "#,
    )
    .bind(stripe_customer_id)
    .bind(subscription_id)
    .bind(&now)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Downgrades whoever holds the given provider subscription id.
pub async fn clear_subscription(
    db: &SqlitePool,
    subscription_id: &str,
) -> Result<bool, AppError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE users
        SET subscription = 'free',
            subscription_id = NULL,
            updated_at = ?1
        WHERE subscription_id = ?2
        "#,
    )
    .bind(&now)
    .bind(subscription_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes a subscriber and everything hanging off them.
pub async fn delete_user_data(db: &SqlitePool, user_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    sqlx::query("DELETE FROM checklists WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    sqlx::query("DELETE FROM reminders WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;

    Ok(())
}

// ---- checklists ----

#[derive(Debug, FromRow)]
struct ChecklistRow {
    id: String,
    user_id: String,
    city: String,
    business_type: String,
    tasks: String,
    created_at: String,
    updated_at: String,
}

impl ChecklistRow {
    fn into_checklist(self) -> Result<Checklist, AppError> {
        let tasks: Vec<ChecklistTask> = serde_json::from_str(&self.tasks)?;
        Ok(Checklist {
            id: self.id,
            user_id: self.user_id,
            city: self.city,
            business_type: self.business_type,
            tasks,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn count_checklists(db: &SqlitePool, user_id: &str) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checklists WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await?;

    Ok(count)
}

pub async fn fetch_checklists(db: &SqlitePool, user_id: &str) -> Result<Vec<Checklist>, AppError> {
    let rows = sqlx::query_as::<_, ChecklistRow>(
        "SELECT id, user_id, city, business_type, tasks, created_at, updated_at FROM checklists WHERE user_id = ? ORDER BY created_at DESC"
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    rows.into_iter().map(ChecklistRow::into_checklist).collect()
}

pub async fn find_checklist(
    db: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Checklist>, AppError> {
    let row = sqlx::query_as::<_, ChecklistRow>(
        "SELECT id, user_id, city, business_type, tasks, created_at, updated_at FROM checklists WHERE id = ? AND user_id = ?"
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    row.map(ChecklistRow::into_checklist).transpose()
}

pub async fn insert_checklist(db: &SqlitePool, checklist: &Checklist) -> Result<(), AppError> {
    let tasks = serde_json::to_string(&checklist.tasks)?;

    sqlx::query(
        r#"
        INSERT INTO checklists
            (id, user_id, city, business_type, tasks, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&checklist.id)
    .bind(&checklist.user_id)
    .bind(&checklist.city)
    .bind(&checklist.business_type)
    .bind(&tasks)
    .bind(&checklist.created_at)
    .bind(&checklist.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn update_checklist_tasks(
    db: &SqlitePool,
    id: &str,
    tasks: &[ChecklistTask],
) -> Result<bool, AppError> {
    let tasks_json = serde_json::to_string(tasks)?;
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query("UPDATE checklists SET tasks = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(&tasks_json)
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes the caller's checklist and cascades to its reminders.
pub async fn delete_checklist(db: &SqlitePool, id: &str, user_id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM checklists WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("DELETE FROM reminders WHERE checklist_id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(true)
}

// ---- checklist templates ----

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: String,
    city: String,
    business_type: String,
    tasks: String,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn into_template(self) -> Result<ChecklistTemplate, AppError> {
        Ok(ChecklistTemplate {
            tasks: serde_json::from_str(&self.tasks)?,
            id: self.id,
            city: self.city,
            business_type: self.business_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub async fn fetch_templates(db: &SqlitePool) -> Result<Vec<ChecklistTemplate>, AppError> {
    let rows = sqlx::query_as::<_, TemplateRow>(
        "SELECT id, city, business_type, tasks, created_at, updated_at FROM checklist_templates ORDER BY city, business_type"
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(TemplateRow::into_template).collect()
}

pub async fn find_template(
    db: &SqlitePool,
    city: &str,
    business_type: &str,
) -> Result<Option<ChecklistTemplate>, AppError> {
    let row = sqlx::query_as::<_, TemplateRow>(
        "SELECT id, city, business_type, tasks, created_at, updated_at FROM checklist_templates WHERE city = ? AND business_type = ?"
    )
    .bind(city)
    .bind(business_type)
    .fetch_optional(db)
    .await?;

    row.map(TemplateRow::into_template).transpose()
}

pub async fn insert_template(
    db: &SqlitePool,
    req: TemplateRequest,
) -> Result<ChecklistTemplate, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let tasks_json = serde_json::to_string(&req.tasks)?;

    sqlx::query(
        r#"
        INSERT INTO checklist_templates
            (id, city, business_type, tasks, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
    )
    .bind(&id)
    .bind(&req.city)
    .bind(&req.business_type)
    .bind(&tasks_json)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(ChecklistTemplate {
        id,
        city: req.city,
        business_type: req.business_type,
        tasks: req.tasks,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn update_template(
    db: &SqlitePool,
    id: &str,
    req: TemplateRequest,
) -> Result<bool, AppError> {
    let tasks_json = serde_json::to_string(&req.tasks)?;
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "UPDATE checklist_templates SET city = ?1, business_type = ?2, tasks = ?3, updated_at = ?4 WHERE id = ?5"
    )
    .bind(&req.city)
    .bind(&req.business_type)
    .bind(&tasks_json)
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_template(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM checklist_templates WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ---- reminders ----

/// A pending reminder joined with its owner's contact details. Only paying
/// subscribers ever appear here.
#[derive(Debug, FromRow)]
pub struct DueReminder {
    #[sqlx(flatten)]
    pub reminder: Reminder,
    pub email: String,
    pub first_name: Option<String>,
}

pub async fn insert_reminders(db: &SqlitePool, reminders: &[Reminder]) -> Result<(), AppError> {
    for reminder in reminders {
        sqlx::query(
            r#"
            INSERT INTO reminders
                (id, user_id, checklist_id, task_name, city, due_date, sent, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            "#,
        )
        .bind(&reminder.id)
        .bind(&reminder.user_id)
        .bind(&reminder.checklist_id)
        .bind(&reminder.task_name)
        .bind(&reminder.city)
        .bind(reminder.due_date)
        .bind(&reminder.created_at)
        .execute(db)
        .await?;
    }

    Ok(())
}

/// Pre-filter for the evaluator: unsent reminders due on or before the
/// cutoff, owned by paying subscribers. The send window is re-checked
/// against a fresh `now` by the caller.
pub async fn fetch_due_reminders(
    db: &SqlitePool,
    due_before: DateTime<Utc>,
) -> Result<Vec<DueReminder>, AppError> {
    let due = sqlx::query_as::<_, DueReminder>(
        r#"
        SELECT r.id, r.user_id, r.checklist_id, r.task_name, r.city,
               r.due_date, r.sent, r.created_at,
               u.email, u.first_name
        FROM reminders r
        JOIN users u ON u.user_id = r.user_id
        WHERE r.sent = 0
          AND r.due_date <= ?
          AND u.subscription = 'paid'
        "#,
    )
    .bind(due_before)
    .fetch_all(db)
    .await?;

    Ok(due)
}

/// Flips `sent` false -> true, but only if it is still false. The affected
/// row count is the authorization that this invocation owns the send.
pub async fn mark_reminder_sent(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE reminders SET sent = 1 WHERE id = ? AND sent = 0")
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_reminders_for_checklist(
    db: &SqlitePool,
    checklist_id: &str,
) -> Result<Vec<Reminder>, AppError> {
    let reminders = sqlx::query_as::<_, Reminder>(
        "SELECT id, user_id, checklist_id, task_name, city, due_date, sent, created_at FROM reminders WHERE checklist_id = ?"
    )
    .bind(checklist_id)
    .fetch_all(db)
    .await?;

    Ok(reminders)
}
