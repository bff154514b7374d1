use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistTask {
    pub task: String,
    /// Free-text renewal cadence copied from the template ("Annual",
    /// "6 months", "N/A", ...).
    pub renewal: String,
    pub completed: bool,
    /// Derived once at checklist creation; never recomputed afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    pub user_id: String,
    pub city: String,
    pub business_type: String,
    pub tasks: Vec<ChecklistTask>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChecklistRequest {
    pub city: String,
    pub business_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub task_index: usize,
    pub completed: bool,
}
