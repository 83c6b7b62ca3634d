//! # SQLite Persistence
//!
//! A cloneable handle around a single SQLite connection. Every public method takes
//! the connection lock, does its synchronous work, and releases it before returning,
//! so no statement outlives an await point.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Activities linked to contacts through activity_contacts
//! - 1.1.0: Reminder recurrence columns
//! - 1.0.0: Initial schema for contacts, notes and relationships

mod activities;
mod contacts;
mod notes;
mod relationships;
mod reminders;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::{debug, info};
use sqlite::{Connection, State, Statement, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    firstname TEXT NOT NULL,
    lastname TEXT NOT NULL DEFAULT '',
    nickname TEXT NOT NULL DEFAULT '',
    gender TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    birthday TEXT,
    photo TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    how_we_met TEXT NOT NULL DEFAULT '',
    food_preference TEXT NOT NULL DEFAULT '',
    work_information TEXT NOT NULL DEFAULT '',
    contact_information TEXT NOT NULL DEFAULT '',
    circles TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notes_contact ON notes(contact_id);

CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_contacts (
    activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    PRIMARY KEY (activity_id, contact_id)
);
CREATE INDEX IF NOT EXISTS idx_activity_contacts_contact ON activity_contacts(contact_id);

CREATE TABLE IF NOT EXISTS relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    name TEXT NOT NULL DEFAULT '',
    relationship_type TEXT NOT NULL,
    gender TEXT NOT NULL DEFAULT '',
    related_contact_id INTEGER REFERENCES contacts(id) ON DELETE SET NULL
);
CREATE INDEX IF NOT EXISTS idx_relationships_contact ON relationships(contact_id);

CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    date TEXT NOT NULL,
    by_mail INTEGER NOT NULL DEFAULT 0,
    recurrence TEXT NOT NULL DEFAULT 'once',
    reoccur_from_completion INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    last_sent TEXT
);
CREATE INDEX IF NOT EXISTS idx_reminders_contact ON reminders(contact_id);
CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(completed, date);
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and bring the schema up to date.
    pub async fn new(path: &str) -> Result<Self> {
        info!("Opening SQLite database at {path}");
        let conn =
            sqlite::open(path).with_context(|| format!("Failed to open database at {path}"))?;
        conn.execute(SCHEMA)
            .context("Failed to initialize database schema")?;
        debug!("Database schema ready");
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }
}

/// Bind `values` to positional parameters 1..=n.
pub(crate) fn bind_all(statement: &mut Statement<'_>, values: &[Value]) -> Result<()> {
    for (index, value) in values.iter().enumerate() {
        statement.bind((index + 1, value.clone()))?;
    }
    Ok(())
}

/// Run a statement that returns no rows.
pub(crate) fn execute(conn: &Connection, sql: &str, values: &[Value]) -> Result<()> {
    let mut statement = conn.prepare(sql)?;
    bind_all(&mut statement, values)?;
    while let State::Row = statement.next()? {}
    Ok(())
}

/// Run a modifying statement and report how many rows it touched.
pub(crate) fn execute_counted(conn: &Connection, sql: &str, values: &[Value]) -> Result<usize> {
    execute(conn, sql, values)?;
    Ok(conn.change_count())
}

pub(crate) fn last_insert_id(conn: &Connection) -> Result<i64> {
    let mut statement = conn.prepare("SELECT last_insert_rowid()")?;
    statement.next()?;
    Ok(statement.read::<i64, _>(0)?)
}

/// Run `f` inside a transaction, rolling back if it fails.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    conn.execute("BEGIN")?;
    let result = f(conn).and_then(|value| {
        conn.execute("COMMIT")
            .context("Failed to commit transaction")?;
        Ok(value)
    });
    if result.is_err() {
        // A failed COMMIT leaves the transaction open on the shared connection
        if let Err(rollback) = conn.execute("ROLLBACK") {
            debug!("Rollback failed: {rollback}");
        }
    }
    result
}

/// `?, ?, ?` for an `IN (...)` list of `count` entries.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub(crate) fn ids_to_values(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|id| Value::Integer(*id)).collect()
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Corrupt date in database: {raw}"))
}

/// Fixed-width UTC form so stored timestamps compare correctly as text.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Corrupt timestamp in database: {raw}"))?
        .with_timezone(&Utc))
}

pub(crate) fn bool_value(flag: bool) -> Value {
    Value::Integer(i64::from(flag))
}
