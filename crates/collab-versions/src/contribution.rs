use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use collab_errors::{CollabError, CollabResult};
use collab_types::UserContribution;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};

/// Per-`(documentId, userId)` aggregate, updated whenever a version is
/// created that folds in that user's changes (spec §3).
pub trait ContributionStore: Send + Sync {
    fn record(
        &self,
        document_id: &str,
        user_id: &str,
        characters_added: u64,
        characters_deleted: u64,
        at: DateTime<Utc>,
    ) -> CollabResult<()>;

    fn get(&self, document_id: &str, user_id: &str) -> CollabResult<Option<UserContribution>>;
}

pub struct SqliteContributionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContributionStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn row_to_contribution(row: &rusqlite::Row) -> rusqlite::Result<UserContribution> {
        let first: String = row.get(4)?;
        let last: String = row.get(5)?;
        Ok(UserContribution {
            document_id: row.get(0)?,
            user_id: row.get(1)?,
            edit_count: row.get::<_, i64>(2)? as u64,
            characters_added: row.get::<_, i64>(3)? as u64,
            characters_deleted: row.get::<_, i64>(6)? as u64,
            first_contribution: first.parse().unwrap_or_else(|_| Utc::now()),
            last_contribution: last.parse().unwrap_or_else(|_| Utc::now()),
        })
    }
}

impl ContributionStore for SqliteContributionStore {
    fn record(
        &self,
        document_id: &str,
        user_id: &str,
        characters_added: u64,
        characters_deleted: u64,
        at: DateTime<Utc>,
    ) -> CollabResult<()> {
        let conn = self.conn.lock();
        let existing = conn
            .query_row(
                "SELECT edit_count, characters_added, characters_deleted, first_contribution \
                 FROM user_contributions WHERE document_id = ?1 AND user_id = ?2",
                params![document_id, user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match existing {
            Some((edit_count, added, deleted, first)) => {
                conn.execute(
                    "UPDATE user_contributions SET edit_count = ?1, characters_added = ?2, \
                     characters_deleted = ?3, last_contribution = ?4 \
                     WHERE document_id = ?5 AND user_id = ?6",
                    params![
                        edit_count + 1,
                        added + characters_added as i64,
                        deleted + characters_deleted as i64,
                        at.to_rfc3339(),
                        document_id,
                        user_id,
                    ],
                )?;
                let _ = first;
            }
            None => {
                conn.execute(
                    "INSERT INTO user_contributions \
                     (id, document_id, user_id, edit_count, characters_added, characters_deleted, \
                      first_contribution, last_contribution) \
                     VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?6)",
                    params![
                        uuid::Uuid::new_v4().to_string(),
                        document_id,
                        user_id,
                        characters_added as i64,
                        characters_deleted as i64,
                        at.to_rfc3339(),
                    ],
                )?;
            }
        }
        Ok(())
    }

    fn get(&self, document_id: &str, user_id: &str) -> CollabResult<Option<UserContribution>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT document_id, user_id, edit_count, characters_added, first_contribution, \
                 last_contribution, characters_deleted \
                 FROM user_contributions WHERE document_id = ?1 AND user_id = ?2",
                params![document_id, user_id],
                Self::row_to_contribution,
            )
            .optional()
            .map_err(CollabError::from)?;
        Ok(row)
    }
}

/// In-memory contribution store for tests.
#[derive(Default)]
pub struct InMemoryContributionStore {
    entries: RwLock<HashMap<(String, String), UserContribution>>,
}

impl InMemoryContributionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContributionStore for InMemoryContributionStore {
    fn record(
        &self,
        document_id: &str,
        user_id: &str,
        characters_added: u64,
        characters_deleted: u64,
        at: DateTime<Utc>,
    ) -> CollabResult<()> {
        let mut entries = self.entries.write();
        entries
            .entry((document_id.to_string(), user_id.to_string()))
            .and_modify(|c| c.record(characters_added, characters_deleted, at))
            .or_insert_with(|| {
                let mut c = UserContribution::new(document_id, user_id, at);
                c.record(characters_added, characters_deleted, at);
                c
            });
        Ok(())
    }

    fn get(&self, document_id: &str, user_id: &str) -> CollabResult<Option<UserContribution>> {
        Ok(self
            .entries
            .read()
            .get(&(document_id.to_string(), user_id.to_string()))
            .cloned())
    }
}
