// Core layer - domain records, configuration, validation
pub mod core;

// Infrastructure - SQLite persistence
pub mod database;

// Features layer - listing, birthdays, reminders, mail, scheduling
pub mod features;

// Presentation - HTTP API and static frontend
pub mod api;

// Re-export core config for the server binary
pub use core::Config;

pub use api::{create_router, AppState};
pub use database::Database;
pub use features::{
    // Contacts
    ContactListing, ContactQuery,
    // Birthdays
    BirthdayJob,
    // Mail
    LogMailer, Mailer, SendGridMailer,
    // Reminders
    ReminderMailJob,
    // Scheduling
    DailyScheduler,
};
