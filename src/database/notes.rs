use anyhow::Result;
use sqlite::{Connection, State, Statement, Value};
use std::collections::HashMap;

use super::{
    bind_all, execute, execute_counted, format_date, ids_to_values, last_insert_id, parse_date,
    placeholders, Database,
};
use crate::core::Note;

fn read_note(statement: &Statement<'_>) -> Result<Note> {
    Ok(Note {
        id: statement.read::<i64, _>("id")?,
        contact_id: statement.read::<i64, _>("contact_id")?,
        content: statement.read::<String, _>("content")?,
        date: parse_date(&statement.read::<String, _>("date")?)?,
    })
}

fn fetch_notes(conn: &Connection, sql: &str, values: &[Value]) -> Result<Vec<Note>> {
    let mut statement = conn.prepare(sql)?;
    bind_all(&mut statement, values)?;
    let mut notes = Vec::new();
    while let State::Row = statement.next()? {
        notes.push(read_note(&statement)?);
    }
    Ok(notes)
}

impl Database {
    pub async fn insert_note(&self, note: &Note) -> Result<Note> {
        let conn = self.conn.lock().await;
        execute(
            &conn,
            "INSERT INTO notes (contact_id, content, date) VALUES (?, ?, ?)",
            &[
                Value::Integer(note.contact_id),
                Value::from(note.content.as_str()),
                Value::String(format_date(note.date)),
            ],
        )?;
        let mut stored = note.clone();
        stored.id = last_insert_id(&conn)?;
        Ok(stored)
    }

    pub async fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let conn = self.conn.lock().await;
        Ok(fetch_notes(
            &conn,
            "SELECT id, contact_id, content, date FROM notes WHERE id = ?",
            &[Value::Integer(id)],
        )?
        .into_iter()
        .next())
    }

    pub async fn update_note(&self, note: &Note) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = execute_counted(
            &conn,
            "UPDATE notes SET content = ?, date = ? WHERE id = ?",
            &[
                Value::from(note.content.as_str()),
                Value::String(format_date(note.date)),
                Value::Integer(note.id),
            ],
        )?;
        Ok(changed > 0)
    }

    pub async fn delete_note(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        Ok(execute_counted(&conn, "DELETE FROM notes WHERE id = ?", &[Value::Integer(id)])? > 0)
    }

    /// Notes for every contact in `contact_ids`, newest first within each contact.
    pub async fn notes_for_contacts(&self, contact_ids: &[i64]) -> Result<HashMap<i64, Vec<Note>>> {
        let mut grouped: HashMap<i64, Vec<Note>> = HashMap::new();
        if contact_ids.is_empty() {
            return Ok(grouped);
        }
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT id, contact_id, content, date FROM notes \
             WHERE contact_id IN ({}) ORDER BY date DESC, id DESC",
            placeholders(contact_ids.len())
        );
        for note in fetch_notes(&conn, &sql, &ids_to_values(contact_ids))? {
            grouped.entry(note.contact_id).or_default().push(note);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContactInput;
    use chrono::NaiveDate;

    async fn seeded() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let contact = ContactInput {
            firstname: Some("Ada".to_string()),
            ..Default::default()
        }
        .into_new_contact()
        .unwrap();
        let id = db.insert_contact(&contact).await.unwrap().id;
        (db, id)
    }

    fn note(contact_id: i64, content: &str, day: u32) -> Note {
        Note {
            id: 0,
            contact_id,
            content: content.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_note_lifecycle() {
        let (db, contact_id) = seeded().await;
        let mut stored = db.insert_note(&note(contact_id, "Likes tea", 1)).await.unwrap();
        assert_eq!(db.get_note(stored.id).await.unwrap().unwrap(), stored);

        stored.content = "Likes coffee".to_string();
        assert!(db.update_note(&stored).await.unwrap());
        assert_eq!(
            db.get_note(stored.id).await.unwrap().unwrap().content,
            "Likes coffee"
        );

        assert!(db.delete_note(stored.id).await.unwrap());
        assert!(db.get_note(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notes_grouped_newest_first() {
        let (db, contact_id) = seeded().await;
        db.insert_note(&note(contact_id, "older", 1)).await.unwrap();
        db.insert_note(&note(contact_id, "newer", 5)).await.unwrap();

        let grouped = db.notes_for_contacts(&[contact_id, 42]).await.unwrap();
        let notes = &grouped[&contact_id];
        assert_eq!(notes[0].content, "newer");
        assert_eq!(notes[1].content, "older");
        assert!(!grouped.contains_key(&42));
    }

    #[tokio::test]
    async fn test_notes_removed_with_contact() {
        let (db, contact_id) = seeded().await;
        let stored = db.insert_note(&note(contact_id, "gone soon", 1)).await.unwrap();
        db.delete_contact(contact_id).await.unwrap();
        assert!(db.get_note(stored.id).await.unwrap().is_none());
    }
}
