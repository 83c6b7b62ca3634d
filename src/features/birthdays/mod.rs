//! # Feature: Birthday Mail
//!
//! Finds contacts celebrating today and mails one templated greeting reminder
//! per contact. Template variables: `birthday_person_nick`, `birthday_person`,
//! `birthday_age`.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Match on month and day only; Feb 29 falls back to Feb 28
//! - 1.0.0: Initial release with SendGrid delivery

use anyhow::Result;
use chrono::NaiveDate;
use log::{error, info};
use std::sync::Arc;

use crate::core::Contact;
use crate::database::Database;
use crate::features::mail::{Mailer, TemplateMessage};
use crate::features::scheduler::RunSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayGreeting {
    pub contact_id: i64,
    pub nick: String,
    pub name: String,
    pub age: String,
}

impl BirthdayGreeting {
    pub fn for_contact(contact: &Contact, today: NaiveDate) -> Self {
        let age = contact
            .birthday
            .and_then(|b| b.age_on(today))
            .map(|years| format!("{years} years old"))
            .unwrap_or_else(|| "unknown age".to_string());

        BirthdayGreeting {
            contact_id: contact.id,
            nick: contact.display_nickname().to_string(),
            name: contact.full_name(),
            age,
        }
    }

    pub fn to_message(&self, to: &str, template_id: &str) -> TemplateMessage {
        TemplateMessage::new(to, template_id)
            .with("birthday_person_nick", self.nick.as_str())
            .with("birthday_person", self.name.as_str())
            .with("birthday_age", self.age.as_str())
    }
}

pub struct BirthdayJob {
    database: Database,
    mailer: Arc<dyn Mailer>,
    to_email: String,
    template_id: String,
}

impl BirthdayJob {
    pub fn new(
        database: Database,
        mailer: Arc<dyn Mailer>,
        to_email: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        BirthdayJob {
            database,
            mailer,
            to_email: to_email.into(),
            template_id: template_id.into(),
        }
    }

    /// Mail a greeting reminder for every birthday on `today`.
    ///
    /// A failed send is logged and counted; the remaining contacts are still mailed.
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        let contacts = self.database.contacts_with_birthday_on(today).await?;
        let mut summary = RunSummary {
            due: contacts.len(),
            ..Default::default()
        };

        for contact in &contacts {
            let greeting = BirthdayGreeting::for_contact(contact, today);
            let message = greeting.to_message(&self.to_email, &self.template_id);
            match self.mailer.send_template(&message).await {
                Ok(()) => {
                    info!(
                        "🎂 Birthday reminder sent for {} ({})",
                        greeting.name, greeting.age
                    );
                    summary.sent += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to send birthday reminder for contact {}: {e:#}",
                        greeting.contact_id
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
