use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use collab_errors::{CollabError, CollabResult};
use collab_types::Version;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};

/// Immutable per-document version snapshots (spec §4.5). Versions are
/// never deleted or mutated once created; `create`/`revert` only ever
/// append.
pub trait VersionStore: Send + Sync {
    fn create(&self, version: Version) -> CollabResult<()>;
    fn latest(&self, document_id: &str) -> CollabResult<Option<Version>>;
    fn get(&self, document_id: &str, version_number: u64) -> CollabResult<Option<Version>>;
    fn list(&self, document_id: &str) -> CollabResult<Vec<Version>>;
}

pub struct SqliteVersionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVersionStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn row_to_version(row: &rusqlite::Row) -> rusqlite::Result<Version> {
        let created_at: String = row.get(5)?;
        Ok(Version {
            id: row.get(0)?,
            document_id: row.get(1)?,
            version_number: row.get::<_, i64>(2)? as u64,
            content: row.get(3)?,
            created_by: row.get(4)?,
            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            change_description: row.get(6)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, document_id, version_number, content, created_by, created_at, change_description";

impl VersionStore for SqliteVersionStore {
    fn create(&self, version: Version) -> CollabResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO document_versions \
             (id, document_id, version_number, content, created_by, created_at, change_description) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                version.id,
                version.document_id,
                version.version_number as i64,
                version.content,
                version.created_by,
                version.created_at.to_rfc3339(),
                version.change_description,
            ],
        )
        .map_err(CollabError::from)?;
        Ok(())
    }

    fn latest(&self, document_id: &str) -> CollabResult<Option<Version>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM document_versions \
                     WHERE document_id = ?1 ORDER BY version_number DESC LIMIT 1"
                ),
                params![document_id],
                Self::row_to_version,
            )
            .optional()?;
        Ok(row)
    }

    fn get(&self, document_id: &str, version_number: u64) -> CollabResult<Option<Version>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM document_versions \
                     WHERE document_id = ?1 AND version_number = ?2"
                ),
                params![document_id, version_number as i64],
                Self::row_to_version,
            )
            .optional()?;
        Ok(row)
    }

    fn list(&self, document_id: &str) -> CollabResult<Vec<Version>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM document_versions \
             WHERE document_id = ?1 ORDER BY version_number DESC"
        ))?;
        let rows = stmt
            .query_map(params![document_id], Self::row_to_version)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// In-memory version store for tests.
#[derive(Default)]
pub struct InMemoryVersionStore {
    versions: RwLock<HashMap<String, Vec<Version>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionStore for InMemoryVersionStore {
    fn create(&self, version: Version) -> CollabResult<()> {
        self.versions
            .write()
            .entry(version.document_id.clone())
            .or_default()
            .push(version);
        Ok(())
    }

    fn latest(&self, document_id: &str) -> CollabResult<Option<Version>> {
        Ok(self
            .versions
            .read()
            .get(document_id)
            .and_then(|versions| versions.iter().max_by_key(|v| v.version_number).cloned()))
    }

    fn get(&self, document_id: &str, version_number: u64) -> CollabResult<Option<Version>> {
        Ok(self
            .versions
            .read()
            .get(document_id)
            .and_then(|versions| versions.iter().find(|v| v.version_number == version_number).cloned()))
    }

    fn list(&self, document_id: &str) -> CollabResult<Vec<Version>> {
        let mut versions = self
            .versions
            .read()
            .get(document_id)
            .cloned()
            .unwrap_or_default();
        versions.sort_by_key(|v| std::cmp::Reverse(v.version_number));
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(doc: &str, number: u64, content: &str) -> Version {
        Version {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: doc.to_string(),
            version_number: number,
            content: content.to_string(),
            created_by: "owner".to_string(),
            created_at: Utc::now(),
            change_description: None,
        }
    }

    #[test]
    fn list_is_newest_first() {
        let store = InMemoryVersionStore::new();
        store.create(version("d1", 0, "")).unwrap();
        store.create(version("d1", 1, "a")).unwrap();
        store.create(version("d1", 2, "ab")).unwrap();

        let listed = store.list("d1").unwrap();
        let numbers: Vec<u64> = listed.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![2, 1, 0]);
    }

    #[test]
    fn latest_tracks_highest_version_number() {
        let store = InMemoryVersionStore::new();
        store.create(version("d1", 0, "")).unwrap();
        store.create(version("d1", 1, "a")).unwrap();
        assert_eq!(store.latest("d1").unwrap().unwrap().version_number, 1);
    }
}
