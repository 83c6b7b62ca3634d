//! # Reminders Feature
//!
//! Recurring reminders with completion-based rescheduling, and daily mail
//! delivery of due reminders.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Reminders belong to contacts; mail delivery through the daily job
//! - 1.0.0: Initial release

pub mod dispatch;
pub mod recurrence;

pub use dispatch::ReminderMailJob;
pub use recurrence::{advance, complete};
