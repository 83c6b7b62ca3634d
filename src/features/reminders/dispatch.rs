//! Daily mail delivery of due reminders
//!
//! Template variables: `reminder_message`, `reminder_contact`, `reminder_date`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::sync::Arc;

use crate::core::Reminder;
use crate::database::Database;
use crate::features::mail::{Mailer, TemplateMessage};
use crate::features::scheduler::RunSummary;

pub struct ReminderMailJob {
    database: Database,
    mailer: Arc<dyn Mailer>,
    to_email: String,
    template_id: String,
}

impl ReminderMailJob {
    pub fn new(
        database: Database,
        mailer: Arc<dyn Mailer>,
        to_email: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        ReminderMailJob {
            database,
            mailer,
            to_email: to_email.into(),
            template_id: template_id.into(),
        }
    }

    async fn send_one(&self, reminder: &Reminder, now: DateTime<Utc>) -> Result<()> {
        let contact_name = match self.database.get_contact(reminder.contact_id).await? {
            Some(contact) => contact.full_name(),
            None => {
                warn!(
                    "Reminder {} points at missing contact {}",
                    reminder.id, reminder.contact_id
                );
                String::new()
            }
        };
        let message = TemplateMessage::new(&self.to_email, &self.template_id)
            .with("reminder_message", reminder.message.as_str())
            .with("reminder_contact", contact_name)
            .with(
                "reminder_date",
                reminder.date.format("%Y-%m-%d %H:%M UTC").to_string(),
            );
        self.mailer.send_template(&message).await?;
        self.database.mark_reminder_sent(reminder.id, now).await
    }

    /// Mail every open `by_mail` reminder due at `now` that has not gone out yet.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let due = self.database.due_mail_reminders(now).await?;
        let mut summary = RunSummary {
            due: due.len(),
            ..Default::default()
        };

        for reminder in &due {
            match self.send_one(reminder, now).await {
                Ok(()) => {
                    info!("⏰ Reminder {} mailed", reminder.id);
                    summary.sent += 1;
                }
                Err(e) => {
                    error!("Failed to mail reminder {}: {e:#}", reminder.id);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }
}
