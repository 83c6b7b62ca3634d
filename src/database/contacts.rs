use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value as JsonValue};
use sqlite::{Connection, State, Statement, Value};

use super::{
    bind_all, execute, execute_counted, format_timestamp, in_transaction, last_insert_id,
    Database,
};
use crate::core::{Birthday, Contact};

const CONTACT_COLUMNS: &str = "id, firstname, lastname, nickname, gender, email, phone, \
     birthday, photo, address, how_we_met, food_preference, work_information, \
     contact_information, circles";

fn read_circles(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("Corrupt circles column: {raw}"))
}

fn read_contact(statement: &Statement<'_>) -> Result<Contact> {
    let birthday = match statement.read::<Option<String>, _>("birthday")? {
        Some(raw) => Some(
            raw.parse::<Birthday>()
                .with_context(|| format!("Corrupt birthday column: {raw}"))?,
        ),
        None => None,
    };
    Ok(Contact {
        id: statement.read::<i64, _>("id")?,
        firstname: statement.read::<String, _>("firstname")?,
        lastname: statement.read::<String, _>("lastname")?,
        nickname: statement.read::<String, _>("nickname")?,
        gender: statement.read::<String, _>("gender")?,
        email: statement.read::<String, _>("email")?,
        phone: statement.read::<String, _>("phone")?,
        birthday,
        photo: statement.read::<String, _>("photo")?,
        address: statement.read::<String, _>("address")?,
        how_we_met: statement.read::<String, _>("how_we_met")?,
        food_preference: statement.read::<String, _>("food_preference")?,
        work_information: statement.read::<String, _>("work_information")?,
        contact_information: statement.read::<String, _>("contact_information")?,
        circles: read_circles(&statement.read::<String, _>("circles")?)?,
        notes: None,
        activities: None,
        relationships: None,
        reminders: None,
    })
}

/// Column values in CONTACT_COLUMNS order, minus the id.
fn contact_values(contact: &Contact) -> Result<Vec<Value>> {
    let birthday = match contact.birthday {
        Some(b) => Value::String(b.to_string()),
        None => Value::Null,
    };
    Ok(vec![
        Value::from(contact.firstname.as_str()),
        Value::from(contact.lastname.as_str()),
        Value::from(contact.nickname.as_str()),
        Value::from(contact.gender.as_str()),
        Value::from(contact.email.as_str()),
        Value::from(contact.phone.as_str()),
        birthday,
        Value::from(contact.photo.as_str()),
        Value::from(contact.address.as_str()),
        Value::from(contact.how_we_met.as_str()),
        Value::from(contact.food_preference.as_str()),
        Value::from(contact.work_information.as_str()),
        Value::from(contact.contact_information.as_str()),
        Value::String(serde_json::to_string(&contact.circles)?),
    ])
}

fn fetch_contacts(conn: &Connection, sql: &str, values: &[Value]) -> Result<Vec<Contact>> {
    let mut statement = conn.prepare(sql)?;
    bind_all(&mut statement, values)?;
    let mut contacts = Vec::new();
    while let State::Row = statement.next()? {
        contacts.push(read_contact(&statement)?);
    }
    Ok(contacts)
}

pub(crate) fn contact_exists_in(conn: &Connection, id: i64) -> Result<bool> {
    let mut statement = conn.prepare("SELECT 1 FROM contacts WHERE id = ?")?;
    statement.bind((1, id))?;
    Ok(matches!(statement.next()?, State::Row))
}

impl Database {
    /// Store a new contact and return it with its assigned id.
    pub async fn insert_contact(&self, contact: &Contact) -> Result<Contact> {
        let conn = self.conn.lock().await;
        let now = Value::String(format_timestamp(Utc::now()));
        let mut values = contact_values(contact)?;
        values.push(now.clone());
        values.push(now);
        execute(
            &conn,
            "INSERT INTO contacts (firstname, lastname, nickname, gender, email, phone, \
             birthday, photo, address, how_we_met, food_preference, work_information, \
             contact_information, circles, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            &values,
        )?;
        let mut stored = contact.clone();
        stored.id = last_insert_id(&conn)?;
        Ok(stored)
    }

    pub async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?");
        Ok(fetch_contacts(&conn, &sql, &[Value::Integer(id)])?
            .into_iter()
            .next())
    }

    pub async fn contact_exists(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        contact_exists_in(&conn, id)
    }

    /// Overwrite the stored row for `contact.id`. Returns false if it does not exist.
    pub async fn update_contact(&self, contact: &Contact) -> Result<bool> {
        let conn = self.conn.lock().await;
        let mut values = contact_values(contact)?;
        values.push(Value::String(format_timestamp(Utc::now())));
        values.push(Value::Integer(contact.id));
        let changed = execute_counted(
            &conn,
            "UPDATE contacts SET firstname = ?, lastname = ?, nickname = ?, gender = ?, \
             email = ?, phone = ?, birthday = ?, photo = ?, address = ?, how_we_met = ?, \
             food_preference = ?, work_information = ?, contact_information = ?, \
             circles = ?, updated_at = ? WHERE id = ?",
            &values,
        )?;
        Ok(changed > 0)
    }

    /// Delete a contact with its notes, relationships, reminders and activity links.
    /// Activities left without any participant are removed too.
    pub async fn delete_contact(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        in_transaction(&conn, |conn| {
            let changed =
                execute_counted(conn, "DELETE FROM contacts WHERE id = ?", &[Value::Integer(id)])?;
            if changed > 0 {
                execute(
                    conn,
                    "DELETE FROM activities WHERE id NOT IN \
                     (SELECT activity_id FROM activity_contacts)",
                    &[],
                )?;
            }
            Ok(changed > 0)
        })
    }

    /// Run a contact listing query and return each row as a JSON object holding
    /// `id` plus the given columns. Column names must come from a trusted whitelist.
    pub async fn contact_rows(
        &self,
        sql: &str,
        values: &[Value],
        fields: &[&str],
    ) -> Result<Vec<Map<String, JsonValue>>> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(sql)?;
        bind_all(&mut statement, values)?;

        let mut rows = Vec::new();
        while let State::Row = statement.next()? {
            let mut row = Map::new();
            row.insert(
                "id".to_string(),
                JsonValue::from(statement.read::<i64, _>("id")?),
            );
            for &field in fields {
                let value = match field {
                    "circles" => JsonValue::from(read_circles(
                        &statement.read::<String, _>(field)?,
                    )?),
                    "birthday" => statement
                        .read::<Option<String>, _>(field)?
                        .map(JsonValue::String)
                        .unwrap_or(JsonValue::Null),
                    _ => JsonValue::String(statement.read::<String, _>(field)?),
                };
                row.insert(field.to_string(), value);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Run a `SELECT COUNT(*)` style query.
    pub async fn count(&self, sql: &str, values: &[Value]) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(sql)?;
        bind_all(&mut statement, values)?;
        statement.next()?;
        Ok(statement.read::<i64, _>(0)?)
    }

    /// Contacts whose birthday falls on `date`, ignoring the year.
    pub async fn contacts_with_birthday_on(&self, date: NaiveDate) -> Result<Vec<Contact>> {
        let keys = Birthday::due_keys(date);
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts \
             WHERE birthday IS NOT NULL AND substr(birthday, -5) IN ({}) ORDER BY id",
            super::placeholders(keys.len())
        );
        let values: Vec<Value> = keys.into_iter().map(Value::String).collect();
        let contacts = fetch_contacts(&conn, &sql, &values)?;
        Ok(contacts
            .into_iter()
            .filter(|c| c.birthday.is_some_and(|b| b.is_due_on(date)))
            .collect())
    }

    /// Every distinct circle in use, sorted.
    pub async fn list_circles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut statement = conn.prepare(
            "SELECT DISTINCT json_each.value AS circle \
             FROM contacts, json_each(contacts.circles) ORDER BY circle",
        )?;
        let mut circles = Vec::new();
        while let State::Row = statement.next()? {
            circles.push(statement.read::<String, _>("circle")?);
        }
        Ok(circles)
    }
}
