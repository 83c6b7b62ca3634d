//! # Feature: Contact Listing
//!
//! Paginated, filtered contact listing with optional field selection and
//! per-page preloading of notes, activities, relationships and reminders.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Total reflects the active filters
//! - 1.0.0: Initial release

pub mod query;

pub use query::{ContactQuery, Include, ListParams, CONTACT_FIELDS};

use crate::core::Contact;
use crate::database::Database;
use anyhow::Result;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct ContactListing {
    pub contacts: Vec<Map<String, Value>>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn attach<T: Serialize>(
    rows: &mut [Map<String, Value>],
    ids: &[i64],
    key: &str,
    mut grouped: HashMap<i64, Vec<T>>,
) -> Result<()> {
    for (row, id) in rows.iter_mut().zip(ids) {
        let items = grouped.remove(id).unwrap_or_default();
        row.insert(key.to_string(), serde_json::to_value(items)?);
    }
    Ok(())
}

/// Run a listing query: one page of rows, the filtered total, and any requested preloads.
pub async fn list_contacts(database: &Database, query: &ContactQuery) -> Result<ContactListing> {
    let (sql, values) = query.select_sql();
    let mut rows = database.contact_rows(&sql, &values, &query.fields).await?;

    let (count_sql, count_values) = query.count_sql();
    let total = database.count(&count_sql, &count_values).await?;

    let ids: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .collect();

    for include in &query.includes {
        let key = include.key();
        match include {
            Include::Notes => attach(&mut rows, &ids, key, database.notes_for_contacts(&ids).await?)?,
            Include::Activities => attach(
                &mut rows,
                &ids,
                key,
                database.activities_for_contacts(&ids).await?,
            )?,
            Include::Relationships => attach(
                &mut rows,
                &ids,
                key,
                database.relationships_for_contacts(&ids).await?,
            )?,
            Include::Reminders => attach(
                &mut rows,
                &ids,
                key,
                database.reminders_for_contacts(&ids).await?,
            )?,
        }
    }

    debug!(
        "Listed {} of {} contacts (page {}, limit {})",
        rows.len(),
        total,
        query.page,
        query.limit
    );

    Ok(ContactListing {
        contacts: rows,
        total,
        page: query.page,
        limit: query.limit,
    })
}

/// A single contact with every collection loaded.
pub async fn load_contact(database: &Database, id: i64) -> Result<Option<Contact>> {
    let Some(mut contact) = database.get_contact(id).await? else {
        return Ok(None);
    };
    let ids = [id];
    contact.notes = Some(
        database
            .notes_for_contacts(&ids)
            .await?
            .remove(&id)
            .unwrap_or_default(),
    );
    contact.activities = Some(
        database
            .activities_for_contacts(&ids)
            .await?
            .remove(&id)
            .unwrap_or_default(),
    );
    contact.relationships = Some(
        database
            .relationships_for_contacts(&ids)
            .await?
            .remove(&id)
            .unwrap_or_default(),
    );
    contact.reminders = Some(
        database
            .reminders_for_contacts(&ids)
            .await?
            .remove(&id)
            .unwrap_or_default(),
    );
    Ok(Some(contact))
}
