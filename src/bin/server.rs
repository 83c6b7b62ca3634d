use anyhow::Result;
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;

use perema::core::Config;
use perema::database::Database;
use perema::features::{
    BirthdayJob, DailyScheduler, LogMailer, Mailer, ReminderMailJob, SendGridMailer,
};
use perema::{create_router, AppState};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server");
}

/// Daily birthday and reminder mail run, on the real mailer when configured.
fn build_scheduler(config: &Config, database: &Database) -> Result<DailyScheduler> {
    let Some(mail) = &config.mail else {
        warn!("SENDGRID_API_KEY not set; notifications will only be logged");
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
        let birthdays = BirthdayJob::new(database.clone(), mailer.clone(), "log", "birthday");
        let reminders = ReminderMailJob::new(database.clone(), mailer, "log", "reminder");
        return Ok(DailyScheduler::new(config.job_time, birthdays).with_reminders(reminders));
    };

    let mailer: Arc<dyn Mailer> = Arc::new(SendGridMailer::new(mail)?);
    let birthdays = BirthdayJob::new(
        database.clone(),
        mailer.clone(),
        mail.to_email.clone(),
        mail.birthday_template_id.clone(),
    );
    let mut scheduler = DailyScheduler::new(config.job_time, birthdays);
    match &mail.reminder_template_id {
        Some(template_id) => {
            scheduler = scheduler.with_reminders(ReminderMailJob::new(
                database.clone(),
                mailer,
                mail.to_email.clone(),
                template_id.clone(),
            ));
        }
        None => info!("SENDGRID_REMINDER_TEMPLATE_ID not set; reminder mails disabled"),
    }
    Ok(scheduler)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting perema {}...", perema::features::get_version());

    let database = Database::new(&config.database_path).await?;
    info!("📦 Database ready at {}", config.database_path);

    let scheduler = build_scheduler(&config, &database)?;
    tokio::spawn(scheduler.run());

    let router = create_router(AppState::new(database), &config.static_dir);
    let listener = TcpListener::bind(config.bind_address).await?;
    info!("🌐 Listening on http://{}", config.bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
