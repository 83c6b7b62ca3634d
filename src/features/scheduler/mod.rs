//! # Feature: Daily Scheduler
//!
//! Fires the birthday job, and the reminder mail job when configured, once a day
//! at a fixed UTC time. Runs as a background task next to the HTTP server.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Also runs reminder mail delivery
//! - 1.0.0: Initial release with the birthday job at 08:00 UTC

use chrono::{DateTime, Days, NaiveTime, Utc};
use log::{error, info};

use crate::features::birthdays::BirthdayJob;
use crate::features::reminders::ReminderMailJob;

/// Outcome of one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
}

/// The first instant at `time` (UTC) strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        now.date_naive()
            .checked_add_days(Days::new(1))
            .map(|tomorrow| tomorrow.and_time(time).and_utc())
            .unwrap_or(today)
    }
}

pub struct DailyScheduler {
    run_at: NaiveTime,
    birthdays: BirthdayJob,
    reminders: Option<ReminderMailJob>,
}

impl DailyScheduler {
    pub fn new(run_at: NaiveTime, birthdays: BirthdayJob) -> Self {
        DailyScheduler {
            run_at,
            birthdays,
            reminders: None,
        }
    }

    pub fn with_reminders(mut self, reminders: ReminderMailJob) -> Self {
        self.reminders = Some(reminders);
        self
    }

    /// Run every job once for `now`. Job failures are logged, never propagated.
    pub async fn run_once(&self, now: DateTime<Utc>) {
        match self.birthdays.run(now.date_naive()).await {
            Ok(summary) => info!(
                "🎂 Birthday job: {} due, {} sent, {} failed",
                summary.due, summary.sent, summary.failed
            ),
            Err(e) => error!("Birthday job failed: {e:#}"),
        }

        if let Some(reminders) = &self.reminders {
            match reminders.run(now).await {
                Ok(summary) => info!(
                    "⏰ Reminder mail job: {} due, {} sent, {} failed",
                    summary.due, summary.sent, summary.failed
                ),
                Err(e) => error!("Reminder mail job failed: {e:#}"),
            }
        }
    }

    /// Sleep until the next run time, run, repeat. Never returns.
    pub async fn run(self) {
        info!("📅 Daily scheduler started, runs at {} UTC", self.run_at.format("%H:%M"));
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.run_at);
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next daily run at {next}");
            tokio::time::sleep(wait).await;
            self.run_once(Utc::now()).await;
        }
    }
}
