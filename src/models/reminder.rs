use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::renewal;

/// One-time email notification for a checklist task's due date. `sent`
/// transitions false -> true exactly once and never reverts; rows are only
/// removed when the owning checklist is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub checklist_id: String,
    pub task_name: String,
    pub city: String,
    pub due_date: DateTime<Utc>,
    pub sent: bool,
    pub created_at: String,
}

impl Reminder {
    /// Dispatchable only while unsent and inside the send window. Overdue
    /// reminders stay unsent forever; there is no backlog flush.
    pub fn is_send_eligible(&self, now: DateTime<Utc>) -> bool {
        !self.sent && renewal::in_send_window(self.due_date, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reminder(due: DateTime<Utc>, sent: bool) -> Reminder {
        Reminder {
            id: "rem_1".to_string(),
            user_id: "user_1".to_string(),
            checklist_id: "cl_1".to_string(),
            task_name: "Health Inspection".to_string(),
            city: "Dallas".to_string(),
            due_date: due,
            sent,
            created_at: due.to_rfc3339(),
        }
    }

    #[test]
    fn sent_reminders_are_never_eligible() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert!(!reminder(now + Duration::days(10), true).is_send_eligible(now));
        assert!(reminder(now + Duration::days(10), false).is_send_eligible(now));
    }

    #[test]
    fn eligibility_tracks_the_send_window() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert!(!reminder(now + Duration::days(31), false).is_send_eligible(now));
        assert!(!reminder(now - Duration::days(1), false).is_send_eligible(now));
        assert!(reminder(now, false).is_send_eligible(now));
        assert!(reminder(now + Duration::days(30), false).is_send_eligible(now));
    }
}
