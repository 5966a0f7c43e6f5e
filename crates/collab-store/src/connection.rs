use std::sync::Arc;

use collab_errors::{CollabError, CollabResult};
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::schema;

/// Opens (and migrates) a SQLite database at `path`, sharing one connection
/// behind a mutex — change volume for a single document's session is low
/// enough that lock contention is not a concern, and this keeps the store
/// layer simple (spec §5 draws the serialization boundary at the document
/// session, not at storage).
pub fn open(path: &str) -> CollabResult<Arc<Mutex<Connection>>> {
    let conn = Connection::open(path)
        .map_err(|e| CollabError::TransientPersistenceFailure(e.to_string()))?;
    schema::migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory SQLite database, for tests that want real SQL semantics
/// without a file on disk.
pub fn open_in_memory() -> CollabResult<Arc<Mutex<Connection>>> {
    let conn = Connection::open_in_memory()
        .map_err(|e| CollabError::TransientPersistenceFailure(e.to_string()))?;
    schema::migrate(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
