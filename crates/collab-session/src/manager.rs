use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use collab_changelog::ChangeLogStore;
use collab_errors::{CollabError, CollabResult};
use collab_ot::{apply, transform_against};
use collab_store::DocumentStore;
use collab_types::{ChangeEntry, ChangeType, Operation, OperationKind};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::session::Session;

/// What the session ingest protocol hands back to the caller once the
/// critical section has released: the transformed operation to fan out to
/// `/<documentId>/operations` (spec §6), already applied and persisted.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub operation: Operation,
    pub document_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Owns one [`Session`] per document and the process-global operation id
/// counter. The single serialization point for document mutation (spec
/// §4.2): everything that touches a document's content goes through
/// [`Self::ingest`].
pub struct SessionManager {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    next_operation_id: AtomicU64,
    document_store: Arc<dyn DocumentStore>,
    change_log: Arc<dyn ChangeLogStore>,
}

impl SessionManager {
    pub fn new(document_store: Arc<dyn DocumentStore>, change_log: Arc<dyn ChangeLogStore>) -> Self {
        Self {
            sessions: DashMap::new(),
            next_operation_id: AtomicU64::new(1),
            document_store,
            change_log,
        }
    }

    fn next_operation_id(&self) -> u64 {
        self.next_operation_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Lazily creates the session for `document_id` from persisted content
    /// if it doesn't already exist. Two racing callers may both load from
    /// the store before one wins the insert; the loser's `Session` is
    /// simply dropped, which is harmless since neither has mutated
    /// anything yet.
    fn get_or_init_session(&self, document_id: &str) -> CollabResult<Arc<Mutex<Session>>> {
        if let Some(existing) = self.sessions.get(document_id) {
            return Ok(existing.clone());
        }
        let document = self
            .document_store
            .get_by_id(document_id)?
            .ok_or_else(|| CollabError::DocumentNotFound(document_id.to_string()))?;
        let fresh = Arc::new(Mutex::new(Session::new(document.content)));
        let session = self
            .sessions
            .entry(document_id.to_string())
            .or_insert_with(|| fresh)
            .clone();
        Ok(session)
    }

    /// Runs the ingest protocol (spec §4.2) for one incoming client
    /// operation: validate, assign a server operation id, transform against
    /// the concurrent slice of `recent`, apply, append to the log, persist,
    /// and hand back what to broadcast. Returns `Ok(None)` when the
    /// transformed operation turned out to be a no-op (RETAIN or a
    /// zero-length DELETE) — nothing is broadcast or persisted for those.
    pub fn ingest(&self, mut op: Operation) -> CollabResult<Option<BroadcastMessage>> {
        op.validate().map_err(CollabError::InvalidOperation)?;

        let document_id = op.document_id.clone();
        let user_id = op.user_id.clone();
        let session_arc = self.get_or_init_session(&document_id)?;

        let applied = {
            let mut session = session_arc.lock();
            let assigned_id = self.next_operation_id();
            op.operation_id = Some(assigned_id);

            self.resync_if_idle(&document_id, &mut session);

            // baseVersion is always 0 for every client (spec §4.1), so the
            // concurrent slice degenerates to "every entry already in
            // `recent`" — they were all assigned smaller ids than the one
            // just handed to `op`.
            let concurrent: Vec<Operation> = session
                .recent
                .iter()
                .filter(|entry| entry.operation_id.is_some_and(|id| id < assigned_id))
                .cloned()
                .collect();

            let transformed = transform_against(&op, &concurrent);

            let is_noop = transformed.kind.is_retain()
                || matches!(&transformed.kind, OperationKind::Delete { length, .. } if *length == 0);
            if is_noop {
                None
            } else {
                // Captured against pre-apply content so a DELETE's change
                // entry can carry the text it removed (spec §3 "Change
                // Entry" / contribution tracking needs it downstream).
                let deleted_text = deleted_substring(&session.content, &transformed.kind);
                session.content = apply(&session.content, &transformed);
                session.push_recent(transformed.clone());
                session.version += 1;
                session.last_activity = Utc::now();
                Some((transformed, session.content.clone(), deleted_text))
            }
        };

        let Some((transformed, new_content, deleted_text)) = applied else {
            return Ok(None);
        };

        // Opportunistic retry of a write that failed last time (spec §7):
        // attempted before the new write so storage catches up in order,
        // but its outcome never gates this ingest's own broadcast.
        if let Some(stale) = session_arc.lock().pending_persist.take() {
            if let Err(err) = self.document_store.update_content(&document_id, &stale) {
                log::warn!("retry of deferred persistence for document {document_id} failed again: {err}");
                session_arc.lock().pending_persist = Some(stale);
            }
        }

        let timestamp = Utc::now();
        if let Err(err) = self
            .change_log
            .append(change_entry_for(&transformed, deleted_text, timestamp))
        {
            log::warn!("failed to persist change-log entry for document {document_id}: {err}");
        }

        // TRANSIENT_PERSISTENCE_FAILURE policy (spec §7): a storage write
        // failing after the in-memory application already succeeded is
        // logged and deferred, never surfaced to the submitter and never
        // allowed to suppress the broadcast — in-memory state and
        // broadcast state must always agree; storage may briefly lag.
        if let Err(err) = self.document_store.update_content(&document_id, &new_content) {
            log::warn!(
                "transient persistence failure for document {document_id}: {err}; will retry on next operation"
            );
            session_arc.lock().pending_persist = Some(new_content);
        }

        Ok(Some(BroadcastMessage {
            operation: transformed,
            document_id,
            user_id,
            timestamp,
        }))
    }

    /// Optional resynchronization (spec §4.2 step 2c): if nothing is
    /// in-flight for this document and the persisted content has diverged
    /// from the in-memory copy, persisted content wins and `recent` is
    /// cleared. An empty `recent` is this crate's stand-in for "no pending
    /// unacknowledged operations" — there is no separate ack channel.
    fn resync_if_idle(&self, document_id: &str, session: &mut Session) {
        if !session.recent.is_empty() {
            return;
        }
        match self.document_store.get_by_id(document_id) {
            Ok(Some(document)) if document.content != session.content => {
                log::debug!("resynchronizing session for document {document_id} from storage");
                session.content = document.content;
                session.recent.clear();
            }
            Ok(_) => {}
            Err(err) => {
                // A transient read failure here just means this ingest
                // proceeds against in-memory content, which is always at
                // least as fresh (spec §4.2 step 2c prefers in-memory
                // anyway when resync isn't certain to help).
                log::warn!("resync check for document {document_id} failed: {err}");
            }
        }
    }

    /// Evicts the session for `document_id`. The next operation re-inits
    /// from persisted content. Called on revert or external content
    /// replacement (spec §4.2 "Reset hook").
    pub fn reset(&self, document_id: &str) {
        self.sessions.remove(document_id);
    }

    /// Current in-memory content, if a session exists. Exposed for tests
    /// and for server-side read paths that want the freshest content
    /// without forcing a session to materialize.
    pub fn current_content(&self, document_id: &str) -> Option<String> {
        self.sessions
            .get(document_id)
            .map(|session| session.lock().content.clone())
    }

    /// Document ids whose session has seen no successful ingest for at
    /// least `max_idle`. Spec §5: eviction is policy the server binary
    /// drives on a timer, not something this crate schedules itself. The
    /// caller is expected to check room membership (via the room manager)
    /// before calling [`Self::reset`] on any of these — eviction must
    /// drain `recent` only when no subscriber remains.
    pub fn idle_documents(&self, max_idle: chrono::Duration) -> Vec<String> {
        let threshold = Utc::now() - max_idle;
        self.sessions
            .iter()
            .filter(|entry| entry.value().lock().last_activity < threshold)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

/// The substring a DELETE is about to remove, read from `content` before
/// `apply` runs. Clamped exactly as `apply` clamps its DELETE case, since a
/// transformed operation's position/length may only be legal against a
/// base state slightly different from what this call holds (spec §4.1).
/// `None` for anything but a non-degenerate DELETE.
fn deleted_substring(content: &str, kind: &OperationKind) -> Option<String> {
    let OperationKind::Delete { length, position } = kind else {
        return None;
    };
    if *length == 0 {
        return None;
    }
    let chars: Vec<char> = content.chars().collect();
    if *position >= chars.len() {
        return None;
    }
    let end = position.saturating_add(*length).min(chars.len());
    Some(chars[*position..end].iter().collect())
}

fn change_entry_for(op: &Operation, deleted_text: Option<String>, timestamp: DateTime<Utc>) -> ChangeEntry {
    let (change_type, content, position) = match &op.kind {
        OperationKind::Insert { content, position } => {
            (ChangeType::Insert, Some(content.clone()), *position)
        }
        OperationKind::Delete { position, .. } => (ChangeType::Delete, deleted_text, *position),
        OperationKind::Retain { .. } => {
            unreachable!("retain operations are filtered out before logging")
        }
    };
    ChangeEntry {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: op.document_id.clone(),
        user_id: op.user_id.clone(),
        change_type,
        content,
        position,
        timestamp,
        version_id: None,
    }
}
