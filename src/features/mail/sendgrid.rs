//! SendGrid v3 dynamic-template client
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Mailer, TemplateMessage};
use crate::core::MailConfig;

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    endpoint: String,
}

impl SendGridMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client for SendGrid")?;
        Ok(SendGridMailer {
            client,
            api_key: config.api_key.clone(),
            from_email: config.from_email.clone(),
            endpoint: SENDGRID_ENDPOINT.to_string(),
        })
    }

    /// Point the client at another endpoint, e.g. a local mock.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, message: &TemplateMessage) -> Value {
        json!({
            "personalizations": [{
                "to": [{ "email": message.to }],
                "dynamic_template_data": message.data,
            }],
            "from": { "email": self.from_email },
            "template_id": message.template_id,
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_template(&self, message: &TemplateMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await
            .context("SendGrid request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("SendGrid returned {status}: {body}");
        }
        debug!(
            "SendGrid accepted template {} for {} ({status})",
            message.template_id, message.to
        );
        Ok(())
    }
}
