pub mod checklist_service;
pub mod reminder_service;
pub mod scheduler;

pub use checklist_service::ChecklistService;
pub use reminder_service::{ReminderService, ReminderStats};
pub use scheduler::ReminderScheduler;
