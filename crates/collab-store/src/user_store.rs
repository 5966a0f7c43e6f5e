use std::collections::HashMap;
use std::sync::Arc;

use collab_errors::CollabResult;
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};

/// A minimal user summary, enough for collaborator-add validation and diff
/// attribution display — the two things the core actually consumes from
/// the user store (spec §6). Account storage and credential verification
/// are out of scope (spec §1).
#[derive(Clone, Debug)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
}

pub trait UserStore: Send + Sync {
    fn exists(&self, id: &str) -> CollabResult<bool>;
    fn is_admin(&self, id: &str) -> CollabResult<bool>;
    fn get_batch(&self, ids: &[String]) -> CollabResult<Vec<UserSummary>>;
}

/// SQLite-backed implementation. The core doesn't own user accounts (spec
/// §1), so this reads a `users` table maintained by the out-of-scope
/// account subsystem; it is provided here only so a standalone binary has
/// something to run against.
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let guard = conn.lock();
        guard
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id       TEXT PRIMARY KEY,
                    name     TEXT NOT NULL,
                    is_admin INTEGER NOT NULL DEFAULT 0
                );",
            )
            .expect("users table migration");
        drop(guard);
        Self { conn }
    }
}

impl UserStore for SqliteUserStore {
    fn exists(&self, id: &str) -> CollabResult<bool> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn is_admin(&self, id: &str) -> CollabResult<bool> {
        let conn = self.conn.lock();
        let is_admin: Option<i64> = conn
            .query_row(
                "SELECT is_admin FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .ok();
        Ok(is_admin.unwrap_or(0) != 0)
    }

    fn get_batch(&self, ids: &[String]) -> CollabResult<Vec<UserSummary>> {
        let conn = self.conn.lock();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let name: Option<String> = conn
                .query_row("SELECT name FROM users WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .ok();
            if let Some(name) = name {
                out.push(UserSummary { id: id.clone(), name });
            }
        }
        Ok(out)
    }
}

/// In-memory implementation for tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, (String, bool)>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, id: impl Into<String>, name: impl Into<String>, is_admin: bool) {
        self.users
            .write()
            .insert(id.into(), (name.into(), is_admin));
    }
}

impl UserStore for InMemoryUserStore {
    fn exists(&self, id: &str) -> CollabResult<bool> {
        Ok(self.users.read().contains_key(id))
    }

    fn is_admin(&self, id: &str) -> CollabResult<bool> {
        Ok(self.users.read().get(id).map(|(_, admin)| *admin).unwrap_or(false))
    }

    fn get_batch(&self, ids: &[String]) -> CollabResult<Vec<UserSummary>> {
        let users = self.users.read();
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|(name, _)| UserSummary { id: id.clone(), name: name.clone() }))
            .collect())
    }
}
