use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Checklist, ChecklistTask, Reminder, SubscriptionTier, User};
use crate::renewal;

pub struct ChecklistService {
    db: SqlitePool,
}

impl ChecklistService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Instantiates the city/business-type template into a checklist owned
    /// by `user`. Each task gets a due date derived once from its renewal
    /// cadence and `now`; tasks without a fixed cadence get none. Paying
    /// subscribers additionally get one pending reminder per dated task,
    /// carrying the same due date.
    pub async fn create_for_user(
        &self,
        user: &User,
        city: &str,
        business_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Checklist, AppError> {
        if city.is_empty() || business_type.is_empty() {
            return Err(AppError::BadRequest(
                "City and business type are required".to_string(),
            ));
        }

        if user.subscription == SubscriptionTier::Free {
            let existing = repository::count_checklists(&self.db, &user.user_id).await?;
            if existing >= 1 {
                return Err(AppError::Forbidden(
                    "Free plan allows only 1 checklist. Upgrade to Pro for unlimited checklists."
                        .to_string(),
                ));
            }
        }

        let template = repository::find_template(&self.db, city, business_type)
            .await?
            .ok_or(AppError::NotFound)?;

        let tasks: Vec<ChecklistTask> = template
            .tasks
            .iter()
            .map(|t| ChecklistTask {
                task: t.task.clone(),
                renewal: t.renewal.clone(),
                completed: false,
                due_date: renewal::derive_due_date(&t.renewal, now),
            })
            .collect();

        let checklist = Checklist {
            id: Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            city: template.city,
            business_type: template.business_type,
            tasks,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };

        repository::insert_checklist(&self.db, &checklist).await?;

        if user.subscription.grants_reminders() {
            let reminders: Vec<Reminder> = checklist
                .tasks
                .iter()
                .filter_map(|task| {
                    task.due_date.map(|due_date| Reminder {
                        id: Uuid::new_v4().to_string(),
                        user_id: user.user_id.clone(),
                        checklist_id: checklist.id.clone(),
                        task_name: task.task.clone(),
                        city: checklist.city.clone(),
                        due_date,
                        sent: false,
                        created_at: now.to_rfc3339(),
                    })
                })
                .collect();

            if !reminders.is_empty() {
                repository::insert_reminders(&self.db, &reminders).await?;
            }
        }

        Ok(checklist)
    }
}
