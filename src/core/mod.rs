//! # Core Module
//!
//! Domain records, configuration, and validation errors shared by every layer.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add Birthday value type
//! - 1.1.0: Add ValidationError
//! - 1.0.0: Initial creation with config and models

pub mod birthday;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used items
pub use birthday::Birthday;
pub use config::{Config, MailConfig};
pub use error::ValidationError;
pub use models::{
    Activity, ActivityInput, Contact, ContactInput, Note, NoteInput, Recurrence, Relationship,
    RelationshipInput, Reminder, ReminderInput,
};
