use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use collab_types::Operation;

/// The cap on the in-memory recent-operations buffer (spec §3). Bounds the
/// cost of `transform_against` per ingest and the memory held by an idle
/// session.
pub const RECENT_CAPACITY: usize = 100;

/// One document's ephemeral in-memory state. Created lazily on first
/// operation, evicted on reset; everything here lives behind the entry
/// lock a [`crate::SessionManager`] hands out, never accessed unlocked.
pub(crate) struct Session {
    pub(crate) content: String,
    pub(crate) version: u64,
    pub(crate) recent: VecDeque<Operation>,
    pub(crate) last_activity: DateTime<Utc>,
    /// Content a prior `update_content` write failed to persist (spec §7
    /// `TRANSIENT_PERSISTENCE_FAILURE` policy). Retried opportunistically
    /// on the next ingest; in-memory state and broadcasts never wait on it.
    pub(crate) pending_persist: Option<String>,
}

impl Session {
    pub(crate) fn new(content: String) -> Self {
        Self {
            content,
            version: 0,
            recent: VecDeque::new(),
            last_activity: Utc::now(),
            pending_persist: None,
        }
    }

    pub(crate) fn push_recent(&mut self, op: Operation) {
        self.recent.push_back(op);
        if self.recent.len() > RECENT_CAPACITY {
            self.recent.pop_front();
        }
    }
}
