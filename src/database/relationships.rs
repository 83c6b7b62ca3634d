use anyhow::Result;
use sqlite::{Connection, State, Value};

use super::{bind_all, execute, execute_counted, last_insert_id, Database};
use crate::core::Relationship;

const RELATIONSHIP_COLUMNS: &str =
    "id, contact_id, name, relationship_type, gender, related_contact_id";

fn fetch_relationships(
    conn: &Connection,
    sql: &str,
    values: &[Value],
) -> Result<Vec<Relationship>> {
    let mut statement = conn.prepare(sql)?;
    bind_all(&mut statement, values)?;
    let mut relationships = Vec::new();
    while let State::Row = statement.next()? {
        relationships.push(Relationship {
            id: statement.read::<i64, _>("id")?,
            contact_id: statement.read::<i64, _>("contact_id")?,
            name: statement.read::<String, _>("name")?,
            relationship_type: statement.read::<String, _>("relationship_type")?,
            gender: statement.read::<String, _>("gender")?,
            related_contact_id: statement.read::<Option<i64>, _>("related_contact_id")?,
        });
    }
    Ok(relationships)
}

fn related_value(relationship: &Relationship) -> Value {
    relationship
        .related_contact_id
        .map(Value::Integer)
        .unwrap_or(Value::Null)
}

impl Database {
    pub async fn insert_relationship(&self, relationship: &Relationship) -> Result<Relationship> {
        let conn = self.conn.lock().await;
        execute(
            &conn,
            "INSERT INTO relationships (contact_id, name, relationship_type, gender, \
             related_contact_id) VALUES (?, ?, ?, ?, ?)",
            &[
                Value::Integer(relationship.contact_id),
                Value::from(relationship.name.as_str()),
                Value::from(relationship.relationship_type.as_str()),
                Value::from(relationship.gender.as_str()),
                related_value(relationship),
            ],
        )?;
        let mut stored = relationship.clone();
        stored.id = last_insert_id(&conn)?;
        Ok(stored)
    }

    pub async fn get_relationship(&self, id: i64) -> Result<Option<Relationship>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE id = ?");
        Ok(fetch_relationships(&conn, &sql, &[Value::Integer(id)])?
            .into_iter()
            .next())
    }

    pub async fn update_relationship(&self, relationship: &Relationship) -> Result<bool> {
        let conn = self.conn.lock().await;
        let changed = execute_counted(
            &conn,
            "UPDATE relationships SET name = ?, relationship_type = ?, gender = ?, \
             related_contact_id = ? WHERE id = ?",
            &[
                Value::from(relationship.name.as_str()),
                Value::from(relationship.relationship_type.as_str()),
                Value::from(relationship.gender.as_str()),
                related_value(relationship),
                Value::Integer(relationship.id),
            ],
        )?;
        Ok(changed > 0)
    }

    pub async fn delete_relationship(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        Ok(execute_counted(
            &conn,
            "DELETE FROM relationships WHERE id = ?",
            &[Value::Integer(id)],
        )? > 0)
    }

    pub async fn relationships_for_contacts(
        &self,
        contact_ids: &[i64],
    ) -> Result<std::collections::HashMap<i64, Vec<Relationship>>> {
        let mut grouped = std::collections::HashMap::new();
        if contact_ids.is_empty() {
            return Ok(grouped);
        }
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE contact_id IN ({}) ORDER BY id",
            super::placeholders(contact_ids.len())
        );
        for relationship in fetch_relationships(&conn, &sql, &super::ids_to_values(contact_ids))? {
            grouped
                .entry(relationship.contact_id)
                .or_insert_with(Vec::new)
                .push(relationship);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContactInput;

    async fn add_contact(db: &Database, name: &str) -> i64 {
        let contact = ContactInput {
            firstname: Some(name.to_string()),
            ..Default::default()
        }
        .into_new_contact()
        .unwrap();
        db.insert_contact(&contact).await.unwrap().id
    }

    #[tokio::test]
    async fn test_related_contact_cleared_on_delete() {
        let db = Database::in_memory().await.unwrap();
        let owner = add_contact(&db, "Owner").await;
        let sibling = add_contact(&db, "Sibling").await;

        let stored = db
            .insert_relationship(&Relationship {
                id: 0,
                contact_id: owner,
                name: "Sam".to_string(),
                relationship_type: "sibling".to_string(),
                gender: String::new(),
                related_contact_id: Some(sibling),
            })
            .await
            .unwrap();

        db.delete_contact(sibling).await.unwrap();
        let loaded = db.get_relationship(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.related_contact_id, None);

        db.delete_contact(owner).await.unwrap();
        assert!(db.get_relationship(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_relationships_grouped_by_owner() {
        let db = Database::in_memory().await.unwrap();
        let owner = add_contact(&db, "Owner").await;
        for kind in ["friend", "colleague"] {
            db.insert_relationship(&Relationship {
                id: 0,
                contact_id: owner,
                name: kind.to_uppercase(),
                relationship_type: kind.to_string(),
                gender: String::new(),
                related_contact_id: None,
            })
            .await
            .unwrap();
        }
        let grouped = db.relationships_for_contacts(&[owner]).await.unwrap();
        let kinds: Vec<_> = grouped[&owner]
            .iter()
            .map(|r| r.relationship_type.as_str())
            .collect();
        assert_eq!(kinds, vec!["friend", "colleague"]);
    }
}
