//! Environment-driven configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Group SendGrid settings into an optional MailConfig
//! - 1.0.0: Initial release with database path and bind address

use anyhow::{Context, Result};
use chrono::NaiveTime;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "perema.db";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_STATIC_DIR: &str = "./static";
pub const DEFAULT_JOB_TIME: &str = "08:00";

/// SendGrid settings. Only present when every required variable is set.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_key: String,
    pub from_email: String,
    pub to_email: String,
    pub birthday_template_id: String,
    pub reminder_template_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_address: SocketAddr,
    pub static_dir: PathBuf,
    pub log_level: String,
    /// UTC time of day the daily job fires
    pub job_time: NaiveTime,
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path =
            var("SQLITE_DB_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

        let bind_raw = var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid BIND_ADDRESS: {bind_raw}"))?;

        let static_dir =
            PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()));

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let job_raw = var("BIRTHDAY_JOB_TIME").unwrap_or_else(|| DEFAULT_JOB_TIME.to_string());
        let job_time = NaiveTime::parse_from_str(&job_raw, "%H:%M")
            .with_context(|| format!("Invalid BIRTHDAY_JOB_TIME (expected HH:MM): {job_raw}"))?;

        let mail = match (
            var("SENDGRID_API_KEY"),
            var("SENDGRID_FROM_EMAIL"),
            var("SENDGRID_TO_EMAIL"),
            var("SENDGRID_BIRTHDAY_TEMPLATE_ID"),
        ) {
            (Some(api_key), Some(from_email), Some(to_email), Some(birthday_template_id)) => {
                Some(MailConfig {
                    api_key,
                    from_email,
                    to_email,
                    birthday_template_id,
                    reminder_template_id: var("SENDGRID_REMINDER_TEMPLATE_ID"),
                })
            }
            _ => None,
        };

        Ok(Config {
            database_path,
            bind_address,
            static_dir,
            log_level,
            job_time,
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_path, "perema.db");
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.static_dir, PathBuf::from("./static"));
        assert_eq!(config.job_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert!(config.mail.is_none());
    }

    #[test]
    fn test_mail_requires_all_fields() {
        let config = config_from(&[
            ("SENDGRID_API_KEY", "key"),
            ("SENDGRID_TO_EMAIL", "me@example.com"),
            ("SENDGRID_BIRTHDAY_TEMPLATE_ID", "d-123"),
        ])
        .unwrap();
        assert!(config.mail.is_none());

        let config = config_from(&[
            ("SENDGRID_API_KEY", "key"),
            ("SENDGRID_FROM_EMAIL", "perema@example.com"),
            ("SENDGRID_TO_EMAIL", "me@example.com"),
            ("SENDGRID_BIRTHDAY_TEMPLATE_ID", "d-123"),
        ])
        .unwrap();
        let mail = config.mail.unwrap();
        assert_eq!(mail.birthday_template_id, "d-123");
        assert!(mail.reminder_template_id.is_none());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("SQLITE_DB_PATH", "  ")]).unwrap();
        assert_eq!(config.database_path, "perema.db");
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("BIND_ADDRESS", "not-an-address")]).is_err());
        assert!(config_from(&[("BIRTHDAY_JOB_TIME", "8 o'clock")]).is_err());
    }

    #[test]
    fn test_custom_job_time() {
        let config = config_from(&[("BIRTHDAY_JOB_TIME", "06:30")]).unwrap();
        assert_eq!(config.job_time, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
    }
}
