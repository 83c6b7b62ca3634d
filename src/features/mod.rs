//! # Features
//!
//! Each feature module carries its own version header. `birthdays`, `reminders`
//! and `mail` together make up the daily notification run driven by `scheduler`.

pub mod birthdays;
pub mod contacts;
pub mod mail;
pub mod reminders;
pub mod scheduler;

pub use birthdays::{BirthdayGreeting, BirthdayJob};
pub use contacts::{list_contacts, load_contact, ContactListing, ContactQuery, ListParams};
pub use mail::{LogMailer, Mailer, SendGridMailer, TemplateMessage};
pub use reminders::ReminderMailJob;
pub use scheduler::{next_run_after, DailyScheduler, RunSummary};

/// Crate version as reported by the health endpoint.
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
