use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlite::{Connection, State, Value};
use std::collections::HashMap;

use super::{
    bind_all, bool_value, execute, execute_counted, format_timestamp, ids_to_values,
    last_insert_id, parse_timestamp, placeholders, Database,
};
use crate::core::Reminder;

const REMINDER_COLUMNS: &str = "id, contact_id, message, date, by_mail, recurrence, \
     reoccur_from_completion, completed, last_sent";

fn fetch_reminders(conn: &Connection, sql: &str, values: &[Value]) -> Result<Vec<Reminder>> {
    let mut statement = conn.prepare(sql)?;
    bind_all(&mut statement, values)?;
    let mut reminders = Vec::new();
    while let State::Row = statement.next()? {
        let last_sent = match statement.read::<Option<String>, _>("last_sent")? {
            Some(raw) => Some(parse_timestamp(&raw)?),
            None => None,
        };
        reminders.push(Reminder {
            id: statement.read::<i64, _>("id")?,
            contact_id: statement.read::<i64, _>("contact_id")?,
            message: statement.read::<String, _>("message")?,
            date: parse_timestamp(&statement.read::<String, _>("date")?)?,
            by_mail: statement.read::<i64, _>("by_mail")? != 0,
            recurrence: statement.read::<String, _>("recurrence")?.parse()?,
            reoccur_from_completion: statement.read::<i64, _>("reoccur_from_completion")? != 0,
            completed: statement.read::<i64, _>("completed")? != 0,
            last_sent,
        });
    }
    Ok(reminders)
}

fn optional_timestamp(ts: Option<DateTime<Utc>>) -> Value {
    ts.map(|ts| Value::String(format_timestamp(ts)))
        .unwrap_or(Value::Null)
}

impl Database {
    pub async fn insert_reminder(&self, reminder: &Reminder) -> Result<Reminder> {
        let conn = self.conn.lock().await;
        execute(
            &conn,
            "INSERT INTO reminders (contact_id, message, date, by_mail, recurrence, \
             reoccur_from_completion, completed, last_sent) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            &[
                Value::Integer(reminder.contact_id),
                Value::from(reminder.message.as_str()),
                Value::String(format_timestamp(reminder.date)),
                bool_value(reminder.by_mail),
                Value::String(reminder.recurrence.to_string()),
                bool_value(reminder.reoccur_from_completion),
                bool_value(reminder.completed),
                optional_timestamp(reminder.last_sent),
            ],
        )?;
        let mut stored = reminder.clone();
        stored.id = last_insert_id(&conn)?;
        Ok(stored)
    }

    pub async fn get_reminder(&self, id: i64) -> Result<Option<Reminder>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?");
        Ok(fetch_reminders(&conn, &sql, &[Value::Integer(id)])?
            .into_iter()
            .next())
    }

    pub async fn update_reminder(&self, reminder: &Reminder) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = execute_counted(
            &conn,
            "UPDATE reminders SET message = ?, date = ?, by_mail = ?, recurrence = ?, \
             reoccur_from_completion = ?, completed = ?, last_sent = ? WHERE id = ?",
            &[
                Value::from(reminder.message.as_str()),
                Value::String(format_timestamp(reminder.date)),
                bool_value(reminder.by_mail),
                Value::String(reminder.recurrence.to_string()),
                bool_value(reminder.reoccur_from_completion),
                bool_value(reminder.completed),
                optional_timestamp(reminder.last_sent),
                Value::Integer(reminder.id),
            ],
        )?;
        Ok(changed > 0)
    }

    pub async fn delete_reminder(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        Ok(execute_counted(
            &conn,
            "DELETE FROM reminders WHERE id = ?",
            &[Value::Integer(id)],
        )? > 0)
    }

    /// Reminders for each contact, soonest first.
    pub async fn reminders_for_contacts(
        &self,
        contact_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Reminder>>> {
        let mut grouped: HashMap<i64, Vec<Reminder>> = HashMap::new();
        if contact_ids.is_empty() {
            return Ok(grouped);
        }
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE contact_id IN ({}) \
             ORDER BY date, id",
            placeholders(contact_ids.len())
        );
        for reminder in fetch_reminders(&conn, &sql, &ids_to_values(contact_ids))? {
            grouped.entry(reminder.contact_id).or_default().push(reminder);
        }
        Ok(grouped)
    }

    /// Open mail reminders due at `now` that have not been sent since they fell due.
    pub async fn due_mail_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders \
             WHERE by_mail = 1 AND completed = 0 AND date <= ? \
             AND (last_sent IS NULL OR last_sent < date) ORDER BY date, id"
        );
        fetch_reminders(&conn, &sql, &[Value::String(format_timestamp(now))])
    }

    pub async fn mark_reminder_sent(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().await;
        execute(
            &conn,
            "UPDATE reminders SET last_sent = ? WHERE id = ?",
            &[Value::String(format_timestamp(at)), Value::Integer(id)],
        )
    }
}
