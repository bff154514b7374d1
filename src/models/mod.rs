pub mod checklist;
pub mod reminder;
pub mod template;
pub mod user;

pub use checklist::{Checklist, ChecklistTask, NewChecklistRequest, UpdateTaskRequest};
pub use reminder::Reminder;
pub use template::{ChecklistTemplate, TemplateRequest, TemplateTask};
pub use user::{NewUser, SubscriptionTier, User};
