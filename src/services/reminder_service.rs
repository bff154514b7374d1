use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::repository;
use crate::email::EmailClient;
use crate::error::AppError;
use crate::models::Reminder;
use crate::renewal::{self, SEND_WINDOW_DAYS};

/// Batch reminder evaluator. Loads pending reminders inside the 30-day
/// pre-filter, re-checks the send window per reminder, dispatches one email
/// each and commits the `sent` flag afterwards. A dispatch failure leaves
/// the reminder pending for the next pass.
pub struct ReminderService {
    db: SqlitePool,
    email: Arc<dyn EmailClient>,
    app_url: String,
    // Serializes the scheduler loop and the manual trigger route; the
    // conditional flag update in the repository stays the per-reminder
    // commit authorization.
    run_lock: Mutex<()>,
}

#[derive(Debug, Serialize)]
pub struct ReminderStats {
    pub loaded: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ReminderService {
    pub fn new(db: SqlitePool, email: Arc<dyn EmailClient>, app_url: String) -> Self {
        Self {
            db,
            email,
            app_url,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<ReminderStats, AppError> {
        self.process_due(Utc::now()).await
    }

    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<ReminderStats, AppError> {
        let _guard = self.run_lock.lock().await;

        let cutoff = now + Duration::days(SEND_WINDOW_DAYS);
        let due = repository::fetch_due_reminders(&self.db, cutoff).await?;

        let mut stats = ReminderStats {
            loaded: due.len(),
            sent: 0,
            skipped: 0,
            failed: 0,
        };

        for item in due {
            let reminder = &item.reminder;

            // The query result is only a pre-filter; the clock may have
            // moved between query and processing, so the window decision is
            // re-made here. Overdue reminders are never sent.
            if !reminder.is_send_eligible(now) {
                stats.skipped += 1;
                continue;
            }

            let days = renewal::days_until(reminder.due_date, now);
            let subject = format!("Reminder: {} due in {} days", reminder.task_name, days);
            let html = reminder_email_html(item.first_name.as_deref(), reminder, days, &self.app_url);

            match self.email.send(&item.email, &subject, &html).await {
                Ok(()) => {
                    if repository::mark_reminder_sent(&self.db, &reminder.id).await? {
                        stats.sent += 1;
                    } else {
                        // Lost the claim: another invocation committed this
                        // reminder first.
                        stats.skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to send reminder {} to {}: {}",
                        reminder.id, item.email, e
                    );
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Reminder pass completed - Loaded: {}, sent: {}, skipped: {}, failed: {}",
            stats.loaded, stats.sent, stats.skipped, stats.failed
        );
        Ok(stats)
    }
}

fn reminder_email_html(
    first_name: Option<&str>,
    reminder: &Reminder,
    days: i64,
    app_url: &str,
) -> String {
    let greeting = first_name.unwrap_or("there");
    let due = reminder.due_date.format("%B %-d, %Y");

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #F97316;">Compliance Reminder</h1>
  <p>Hello {greeting},</p>

  <p>This is a friendly reminder that your <strong>{task}</strong>
  in <strong>{city}</strong> is due in <strong>{days} days</strong>.</p>

  <div style="background-color: #FEF3C7; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p style="margin: 0;"><strong>Task:</strong> {task}</p>
    <p style="margin: 10px 0 0 0;"><strong>Due Date:</strong> {due}</p>
    <p style="margin: 10px 0 0 0;"><strong>City:</strong> {city}</p>
  </div>

  <p>Don't forget to renew on time to stay compliant!</p>

  <p style="margin-top: 30px;">
    <a href="{app_url}/dashboard"
       style="background-color: #F97316; color: white; padding: 12px 24px;
              text-decoration: none; border-radius: 6px; font-weight: bold;">
      View My Checklists
    </a>
  </p>

  <p style="margin-top: 30px; font-size: 14px; color: #666;">
    Best regards,<br>
    The Compliance Buddy Team
  </p>
</div>"#,
        task = reminder.task_name,
        city = reminder.city,
    )
}
