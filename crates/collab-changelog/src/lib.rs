//! Append-only per-document change log (C2, spec §4.3).
//!
//! Entries are durable; the only in-place mutation is setting or clearing
//! `version_id` when a version is created or reverted. Ordering is by
//! `timestamp` ascending, ties broken by insertion order — a change whose
//! application was a no-op (zero-length DELETE, RETAIN) is never appended
//! here in the first place; that filtering is the session's job (C3), not
//! this crate's.

mod memory;
mod sqlite;

pub use memory::InMemoryChangeLog;
pub use sqlite::SqliteChangeLog;

use collab_errors::CollabResult;
use collab_types::ChangeEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

pub trait ChangeLogStore: Send + Sync {
    fn append(&self, entry: ChangeEntry) -> CollabResult<()>;
    fn list_by_document(&self, document_id: &str, order: Order) -> CollabResult<Vec<ChangeEntry>>;
    fn list_unversioned(&self, document_id: &str) -> CollabResult<Vec<ChangeEntry>>;
    fn list_by_version(&self, version_id: &str) -> CollabResult<Vec<ChangeEntry>>;
    fn link_unversioned_to_version(&self, document_id: &str, version_id: &str) -> CollabResult<()>;
    fn unlink_from_versions(&self, document_id: &str, version_ids: &[String]) -> CollabResult<()>;
}
