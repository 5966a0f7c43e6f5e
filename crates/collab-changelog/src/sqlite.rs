use std::sync::Arc;

use collab_errors::{CollabError, CollabResult};
use collab_types::{ChangeEntry, ChangeType};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};

use crate::{ChangeLogStore, Order};

pub struct SqliteChangeLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChangeLog {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn row_to_entry(row: &Row) -> rusqlite::Result<ChangeEntry> {
        let change_type: String = row.get(3)?;
        let timestamp: String = row.get(6)?;
        Ok(ChangeEntry {
            id: row.get(0)?,
            document_id: row.get(1)?,
            user_id: row.get(2)?,
            change_type: match change_type.as_str() {
                "INSERT" => ChangeType::Insert,
                "DELETE" => ChangeType::Delete,
                _ => ChangeType::Update,
            },
            content: row.get(4)?,
            position: row.get::<_, i64>(5)? as usize,
            timestamp: timestamp
                .parse()
                .unwrap_or_else(|_| chrono::Utc::now()),
            version_id: row.get(7)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, document_id, user_id, change_type, content, position, timestamp, version_id";

impl ChangeLogStore for SqliteChangeLog {
    fn append(&self, entry: ChangeEntry) -> CollabResult<()> {
        let conn = self.conn.lock();
        let change_type = match entry.change_type {
            ChangeType::Insert => "INSERT",
            ChangeType::Delete => "DELETE",
            ChangeType::Update => "UPDATE",
        };
        conn.execute(
            "INSERT INTO change_tracking \
             (id, document_id, user_id, change_type, content, position, timestamp, version_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.document_id,
                entry.user_id,
                change_type,
                entry.content,
                entry.position as i64,
                entry.timestamp.to_rfc3339(),
                entry.version_id,
            ],
        )
        .map_err(CollabError::from)?;
        Ok(())
    }

    fn list_by_document(&self, document_id: &str, order: Order) -> CollabResult<Vec<ChangeEntry>> {
        let conn = self.conn.lock();
        let direction = match order {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        };
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM change_tracking WHERE document_id = ?1 \
             ORDER BY timestamp {direction}, rowid {direction}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![document_id], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn list_unversioned(&self, document_id: &str) -> CollabResult<Vec<ChangeEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM change_tracking \
             WHERE document_id = ?1 AND version_id IS NULL ORDER BY timestamp ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params![document_id], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn list_by_version(&self, version_id: &str) -> CollabResult<Vec<ChangeEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM change_tracking \
             WHERE version_id = ?1 ORDER BY timestamp ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params![version_id], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn link_unversioned_to_version(&self, document_id: &str, version_id: &str) -> CollabResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE change_tracking SET version_id = ?1 \
             WHERE document_id = ?2 AND version_id IS NULL",
            params![version_id, document_id],
        )?;
        Ok(())
    }

    fn unlink_from_versions(&self, document_id: &str, version_ids: &[String]) -> CollabResult<()> {
        if version_ids.is_empty() {
            return Ok(());
        }
        let conn = self.conn.lock();
        let placeholders = version_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "UPDATE change_tracking SET version_id = NULL \
             WHERE document_id = ? AND version_id IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rusqlite_params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(version_ids.len() + 1);
        rusqlite_params.push(&document_id);
        for vid in version_ids {
            rusqlite_params.push(vid);
        }
        stmt.execute(rusqlite_params.as_slice())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use collab_store::open_in_memory;

    use super::*;

    fn entry(doc: &str) -> ChangeEntry {
        ChangeEntry {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: doc.to_string(),
            user_id: "u1".to_string(),
            change_type: ChangeType::Insert,
            content: Some("x".to_string()),
            position: 0,
            timestamp: Utc::now(),
            version_id: None,
        }
    }

    #[test]
    fn append_and_list_round_trips() {
        let conn = open_in_memory().unwrap();
        let log = SqliteChangeLog::new(conn);
        log.append(entry("d1")).unwrap();
        log.append(entry("d1")).unwrap();
        let listed = log.list_by_document("d1", Order::Ascending).unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn linking_clears_unversioned_bucket() {
        let conn = open_in_memory().unwrap();
        let log = SqliteChangeLog::new(conn);
        log.append(entry("d1")).unwrap();
        log.link_unversioned_to_version("d1", "v1").unwrap();
        assert_eq!(log.list_unversioned("d1").unwrap().len(), 0);
        assert_eq!(log.list_by_version("v1").unwrap().len(), 1);
    }
}
