//! # Feature: Templated Mail
//!
//! Outbound notification mail. Messages reference a provider-side template and
//! carry only the dynamic values that fill it.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: true

pub mod sendgrid;

pub use sendgrid::SendGridMailer;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::collections::BTreeMap;

/// A message rendered by the mail provider from `template_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMessage {
    pub to: String,
    pub template_id: String,
    pub data: BTreeMap<String, String>,
}

impl TemplateMessage {
    pub fn new(to: impl Into<String>, template_id: impl Into<String>) -> Self {
        TemplateMessage {
            to: to.into(),
            template_id: template_id.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_template(&self, message: &TemplateMessage) -> Result<()>;
}

/// Stand-in used when no mail provider is configured; logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_template(&self, message: &TemplateMessage) -> Result<()> {
        info!(
            "📭 Mail disabled, would send template {} to {} with {:?}",
            message.template_id, message.to, message.data
        );
        Ok(())
    }
}
