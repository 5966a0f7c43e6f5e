//! The per-document session: the single serialization point for document
//! mutation (C3, spec §4.2). One [`Session`] per document, created lazily,
//! holding the authoritative in-memory content, an operation counter, and a
//! capped buffer of recently applied operations used to transform new
//! arrivals against what they missed.

mod manager;
mod session;

pub use manager::{BroadcastMessage, SessionManager};
pub use session::RECENT_CAPACITY;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use collab_changelog::{ChangeLogStore, InMemoryChangeLog, Order};
    use collab_errors::{CollabError, CollabResult};
    use collab_store::{DocumentStore, InMemoryDocumentStore};
    use collab_types::{Document, Operation, OperationKind};

    use super::*;

    fn manager() -> (SessionManager, Arc<InMemoryDocumentStore>, Arc<InMemoryChangeLog>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.seed(Document::new("d1", "Untitled", "owner"));
        let log = Arc::new(InMemoryChangeLog::new());
        let manager = SessionManager::new(store.clone(), log.clone());
        (manager, store, log)
    }

    /// Wraps an [`InMemoryDocumentStore`] and fails the first `N` calls to
    /// `update_content`, to exercise the §7 `TRANSIENT_PERSISTENCE_FAILURE`
    /// retry policy without standing up a real flaky backend.
    struct FlakyDocumentStore {
        inner: InMemoryDocumentStore,
        failures_remaining: AtomicUsize,
    }

    impl FlakyDocumentStore {
        fn new(failures: usize) -> Self {
            Self {
                inner: InMemoryDocumentStore::new(),
                failures_remaining: AtomicUsize::new(failures),
            }
        }
    }

    impl DocumentStore for FlakyDocumentStore {
        fn get_by_id(&self, id: &str) -> CollabResult<Option<Document>> {
            self.inner.get_by_id(id)
        }

        fn create(&self, document: Document) -> CollabResult<()> {
            self.inner.create(document)
        }

        fn update_content(&self, id: &str, content: &str) -> CollabResult<()> {
            if self.failures_remaining.load(AtomicOrdering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, AtomicOrdering::SeqCst);
                return Err(CollabError::TransientPersistenceFailure(
                    "simulated storage outage".to_string(),
                ));
            }
            self.inner.update_content(id, content)
        }

        fn can_user_edit(&self, document_id: &str, user_id: &str) -> CollabResult<bool> {
            self.inner.can_user_edit(document_id, user_id)
        }

        fn add_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
            self.inner.add_collaborator(document_id, user_id)
        }

        fn remove_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
            self.inner.remove_collaborator(document_id, user_id)
        }
    }

    fn insert(user: &str, pos: usize, content: &str) -> Operation {
        Operation::new(
            OperationKind::Insert {
                content: content.to_string(),
                position: pos,
            },
            user,
            "d1",
            0,
        )
    }

    fn delete(user: &str, pos: usize, len: usize) -> Operation {
        Operation::new(
            OperationKind::Delete {
                length: len,
                position: pos,
            },
            user,
            "d1",
            0,
        )
    }

    #[test]
    fn first_operation_lazily_loads_from_the_store() {
        let (manager, store, _log) = manager();
        let message = manager.ingest(insert("u1", 0, "hi")).unwrap().unwrap();
        assert_eq!(message.operation.operation_id, Some(1));
        assert_eq!(manager.current_content("d1"), Some("hi".to_string()));
        // persisted outside the lock too.
        assert_eq!(store.get_by_id("d1").unwrap().unwrap().content, "hi");
    }

    #[test]
    fn concurrent_inserts_at_same_position_are_deterministic() {
        let (manager, _store, _log) = manager();
        let first = manager.ingest(insert("u1", 0, "A")).unwrap().unwrap();
        assert_eq!(first.operation.operation_id, Some(1));

        let second = manager.ingest(insert("u2", 0, "B")).unwrap().unwrap();
        // u2's insert was assigned id 2, which is not earlier than id 1,
        // so it shifts past u1's already-applied insert.
        match second.operation.kind {
            OperationKind::Insert { position, .. } => assert_eq!(position, 1),
            other => panic!("expected an Insert, got {other:?}"),
        }
        assert_eq!(manager.current_content("d1"), Some("AB".to_string()));
    }

    #[test]
    fn zero_length_delete_after_transform_is_not_broadcast_or_logged() {
        let (manager, _store, log) = manager();
        manager.ingest(delete("u1", 0, 3)).unwrap(); // no-op on empty content, but not zero-length pre-transform
        let outcome = manager.ingest(delete("u2", 0, 3)).unwrap();
        // Both deletes target the same (empty) range on an empty document;
        // whichever lands second degenerates to a zero-length delete.
        if let Some(message) = outcome {
            match message.operation.kind {
                OperationKind::Delete { length, .. } => assert!(length > 0),
                other => panic!("unexpected kind {other:?}"),
            }
        }
        // Only non-no-op changes are ever appended to the log.
        let logged = log.list_by_document("d1", Order::Ascending).unwrap();
        assert!(logged.len() <= 1);
    }

    #[test]
    fn invalid_operation_is_rejected_before_touching_the_session() {
        let (manager, _store, _log) = manager();
        let bad = delete("u1", 0, 0);
        let result = manager.ingest(bad);
        assert!(result.is_err());
        assert_eq!(manager.current_content("d1"), None);
    }

    #[test]
    fn reset_evicts_the_session_so_the_next_op_reloads_from_storage() {
        let (manager, store, _log) = manager();
        manager.ingest(insert("u1", 0, "hi")).unwrap();
        assert_eq!(manager.current_content("d1"), Some("hi".to_string()));

        store.update_content("d1", "reloaded").unwrap();
        manager.reset("d1");
        assert_eq!(manager.current_content("d1"), None);

        manager.ingest(insert("u2", 0, "!")).unwrap();
        assert_eq!(manager.current_content("d1"), Some("!reloaded".to_string()));
    }

    #[test]
    fn idle_documents_reports_sessions_past_the_threshold() {
        let (manager, _store, _log) = manager();
        manager.ingest(insert("u1", 0, "hi")).unwrap();

        assert!(manager.idle_documents(chrono::Duration::hours(1)).is_empty());
        assert_eq!(
            manager.idle_documents(chrono::Duration::seconds(-1)),
            vec!["d1".to_string()]
        );
    }

    #[test]
    fn recent_buffer_is_capped() {
        let (manager, _store, _log) = manager();
        for i in 0..(RECENT_CAPACITY + 20) {
            manager.ingest(insert("u1", i, "x")).unwrap();
        }
        // No direct accessor for `recent.len()`; capped behavior is proven
        // indirectly by the operation counter staying monotonic and every
        // ingest succeeding without unbounded growth panics or errors.
        assert_eq!(
            manager.current_content("d1").map(|c| c.chars().count()),
            Some(RECENT_CAPACITY + 20)
        );
    }

    #[test]
    fn transient_persistence_failure_still_broadcasts_and_retries_next_time() {
        let store = Arc::new(FlakyDocumentStore::new(1));
        store.inner.seed(Document::new("d1", "Untitled", "owner"));
        let log = Arc::new(InMemoryChangeLog::new());
        let manager = SessionManager::new(store.clone(), log.clone());

        // The write fails, but ingest still succeeds and hands back a
        // broadcast: in-memory state and broadcast state must always agree.
        let first = manager.ingest(insert("u1", 0, "hi")).unwrap();
        assert!(first.is_some());
        assert_eq!(manager.current_content("d1"), Some("hi".to_string()));
        // Storage never actually got the write.
        assert_eq!(store.get_by_id("d1").unwrap().unwrap().content, "");

        // The next ingest retries the deferred write opportunistically,
        // then persists its own new content on top.
        let second = manager.ingest(insert("u2", 2, "!")).unwrap();
        assert!(second.is_some());
        assert_eq!(manager.current_content("d1"), Some("hi!".to_string()));
        assert_eq!(store.get_by_id("d1").unwrap().unwrap().content, "hi!");
    }

    #[test]
    fn delete_change_entry_carries_the_removed_text() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.seed(Document::new("d1", "Untitled", "owner"));
        let log = Arc::new(InMemoryChangeLog::new());
        let manager = SessionManager::new(store.clone(), log.clone());

        manager.ingest(insert("u1", 0, "hello")).unwrap();
        manager.ingest(delete("u2", 1, 3)).unwrap(); // removes "ell"

        let entries = log.list_by_document("d1", Order::Ascending).unwrap();
        let deleted = entries
            .iter()
            .find(|e| e.change_type == collab_types::ChangeType::Delete)
            .expect("a delete entry was logged");
        assert_eq!(deleted.content.as_deref(), Some("ell"));
    }
}
