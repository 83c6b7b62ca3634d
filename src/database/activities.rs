use anyhow::Result;
use sqlite::{Connection, State, Value};
use std::collections::HashMap;

use super::{
    bind_all, execute, execute_counted, format_date, ids_to_values, in_transaction,
    last_insert_id, parse_date, placeholders, Database,
};
use crate::core::Activity;

/// Activities keyed by id, with `contact_ids` still empty.
fn fetch_activity_rows(conn: &Connection, sql: &str, values: &[Value]) -> Result<Vec<Activity>> {
    let mut statement = conn.prepare(sql)?;
    bind_all(&mut statement, values)?;
    let mut activities = Vec::new();
    while let State::Row = statement.next()? {
        activities.push(Activity {
            id: statement.read::<i64, _>("id")?,
            title: statement.read::<String, _>("title")?,
            description: statement.read::<String, _>("description")?,
            location: statement.read::<String, _>("location")?,
            date: parse_date(&statement.read::<String, _>("date")?)?,
            contact_ids: Vec::new(),
        });
    }
    Ok(activities)
}

fn attach_participants(conn: &Connection, activities: &mut [Activity]) -> Result<()> {
    if activities.is_empty() {
        return Ok(());
    }
    let ids: Vec<i64> = activities.iter().map(|a| a.id).collect();
    let sql = format!(
        "SELECT activity_id, contact_id FROM activity_contacts \
         WHERE activity_id IN ({}) ORDER BY contact_id",
        placeholders(ids.len())
    );
    let mut statement = conn.prepare(&sql)?;
    bind_all(&mut statement, &ids_to_values(&ids))?;

    let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
    while let State::Row = statement.next()? {
        links
            .entry(statement.read::<i64, _>("activity_id")?)
            .or_default()
            .push(statement.read::<i64, _>("contact_id")?);
    }
    for activity in activities.iter_mut() {
        activity.contact_ids = links.remove(&activity.id).unwrap_or_default();
    }
    Ok(())
}

fn replace_participants(conn: &Connection, activity: &Activity) -> Result<()> {
    execute(
        conn,
        "DELETE FROM activity_contacts WHERE activity_id = ?",
        &[Value::Integer(activity.id)],
    )?;
    for contact_id in &activity.contact_ids {
        execute(
            conn,
            "INSERT INTO activity_contacts (activity_id, contact_id) VALUES (?, ?)",
            &[Value::Integer(activity.id), Value::Integer(*contact_id)],
        )?;
    }
    Ok(())
}

impl Database {
    /// Ids from `ids` that do not name a stored contact.
    pub async fn missing_contacts(&self, ids: &[i64]) -> Result<Vec<i64>> {
        let conn = self.conn.lock().await;
        let mut missing = Vec::new();
        for &id in ids {
            if !super::contacts::contact_exists_in(&conn, id)? {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    pub async fn insert_activity(&self, activity: &Activity) -> Result<Activity> {
        let conn = self.conn.lock().await;
        in_transaction(&conn, |conn| {
            execute(
                conn,
                "INSERT INTO activities (title, description, location, date) VALUES (?, ?, ?, ?)",
                &[
                    Value::from(activity.title.as_str()),
                    Value::from(activity.description.as_str()),
                    Value::from(activity.location.as_str()),
                    Value::String(format_date(activity.date)),
                ],
            )?;
            let mut stored = activity.clone();
            stored.id = last_insert_id(conn)?;
            stored.contact_ids.sort_unstable();
            replace_participants(conn, &stored)?;
            Ok(stored)
        })
    }

    pub async fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
        let conn = self.conn.lock().await;
        let mut activities = fetch_activity_rows(
            &conn,
            "SELECT id, title, description, location, date FROM activities WHERE id = ?",
            &[Value::Integer(id)],
        )?;
        attach_participants(&conn, &mut activities)?;
        Ok(activities.into_iter().next())
    }

    pub async fn update_activity(&self, activity: &Activity) -> Result<bool> {
        let conn = self.conn.lock().await;
        in_transaction(&conn, |conn| {
            let changed = execute_counted(
                conn,
                "UPDATE activities SET title = ?, description = ?, location = ?, date = ? \
                 WHERE id = ?",
                &[
                    Value::from(activity.title.as_str()),
                    Value::from(activity.description.as_str()),
                    Value::from(activity.location.as_str()),
                    Value::String(format_date(activity.date)),
                    Value::Integer(activity.id),
                ],
            )?;
            if changed > 0 {
                replace_participants(conn, activity)?;
            }
            Ok(changed > 0)
        })
    }

    pub async fn delete_activity(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        Ok(execute_counted(
            &conn,
            "DELETE FROM activities WHERE id = ?",
            &[Value::Integer(id)],
        )? > 0)
    }

    /// Activities involving each contact in `contact_ids`, newest first.
    pub async fn activities_for_contacts(
        &self,
        contact_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Activity>>> {
        let mut grouped: HashMap<i64, Vec<Activity>> = HashMap::new();
        if contact_ids.is_empty() {
            return Ok(grouped);
        }
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT DISTINCT a.id, a.title, a.description, a.location, a.date \
             FROM activities a JOIN activity_contacts ac ON ac.activity_id = a.id \
             WHERE ac.contact_id IN ({}) ORDER BY a.date DESC, a.id DESC",
            placeholders(contact_ids.len())
        );
        let mut activities = fetch_activity_rows(&conn, &sql, &ids_to_values(contact_ids))?;
        attach_participants(&conn, &mut activities)?;

        for activity in activities {
            for contact_id in contact_ids {
                if activity.contact_ids.contains(contact_id) {
                    grouped
                        .entry(*contact_id)
                        .or_default()
                        .push(activity.clone());
                }
            }
        }
        Ok(grouped)
    }
}
