//! Authorization-gated room and presence manager (C4, spec §4.4).
//!
//! Subscription is gated by a `canEdit` predicate delegated to the
//! document store; this crate only knows the predicate as a function, not
//! the store itself, so it stays decoupled from any particular
//! persistence choice (spec §9 "ownership of the session" applies equally
//! here: room state belongs to this manager, nothing else reaches in).

mod member;
mod presence;
mod subscription;

pub use member::MemberInfo;
pub use presence::PresenceEvent;
pub use subscription::SubscriptionPath;

use std::sync::Arc;

use chrono::Utc;
use collab_errors::{CollabError, CollabResult};
use collab_types::{cursor_color, Cursor};
use dashmap::{DashMap, DashSet};
use member::Member;

/// `canEdit(documentId, userId)`, delegated to the document store. Boxed
/// so the manager can be constructed against any authorization source —
/// a real store, a stub, or a closure capturing test state.
pub type CanEditFn = dyn Fn(&str, &str) -> CollabResult<bool> + Send + Sync;

pub struct RoomManager {
    rooms: DashMap<String, DashMap<String, Member>>,
    user_documents: DashMap<String, DashSet<String>>,
    can_edit: Arc<CanEditFn>,
}

impl RoomManager {
    pub fn new(can_edit: Arc<CanEditFn>) -> Self {
        Self {
            rooms: DashMap::new(),
            user_documents: DashMap::new(),
            can_edit,
        }
    }

    fn authorize(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
        if (self.can_edit)(document_id, user_id)? {
            Ok(())
        } else {
            Err(CollabError::Unauthorized(format!(
                "user {user_id} may not access document {document_id}"
            )))
        }
    }

    /// Admits `user_id` iff `canEdit` holds, and emits `user_joined`.
    pub fn join(
        &self,
        document_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> CollabResult<PresenceEvent> {
        self.authorize(document_id, user_id)?;
        self.admit(document_id, user_id, user_name);
        log::info!("user {user_id} joined room {document_id}");
        Ok(PresenceEvent::UserJoined {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            user_count: self.member_count(document_id),
        })
    }

    /// Idempotent: does not re-authorize or re-emit if already a member.
    fn admit(&self, document_id: &str, user_id: &str, user_name: &str) {
        let room = self.rooms.entry(document_id.to_string()).or_default();
        room.entry(user_id.to_string()).or_insert_with(|| Member {
            user_name: user_name.to_string(),
            joined_at: Utc::now(),
        });
        drop(room);
        self.user_documents
            .entry(user_id.to_string())
            .or_default()
            .insert(document_id.to_string());
    }

    /// Emits `user_left`; evicts the room entry once it empties.
    pub fn leave(&self, document_id: &str, user_id: &str) -> Option<PresenceEvent> {
        let removed = self
            .rooms
            .get(document_id)
            .map(|room| room.remove(user_id).is_some())
            .unwrap_or(false);
        if !removed {
            return None;
        }
        if let Some(docs) = self.user_documents.get(user_id) {
            docs.remove(document_id);
        }
        let should_evict = self
            .rooms
            .get(document_id)
            .map(|room| room.is_empty())
            .unwrap_or(false);
        if should_evict {
            self.rooms.remove(document_id);
        }
        log::info!("user {user_id} left room {document_id}");
        Some(PresenceEvent::UserLeft {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
            user_count: self.member_count(document_id),
        })
    }

    /// Leaves every room the user is in. Used on client disconnect.
    pub fn disconnect(&self, user_id: &str) -> Vec<PresenceEvent> {
        let documents: Vec<String> = self
            .user_documents
            .get(user_id)
            .map(|docs| docs.iter().map(|d| d.clone()).collect())
            .unwrap_or_default();
        documents
            .into_iter()
            .filter_map(|doc| self.leave(&doc, user_id))
            .collect()
    }

    pub fn list(&self, document_id: &str) -> Vec<MemberInfo> {
        self.rooms
            .get(document_id)
            .map(|room| {
                room.iter()
                    .map(|entry| MemberInfo {
                        user_id: entry.key().clone(),
                        user_name: entry.value().user_name.clone(),
                        joined_at: entry.value().joined_at,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_member(&self, document_id: &str, user_id: &str) -> bool {
        self.rooms
            .get(document_id)
            .map(|room| room.contains_key(user_id))
            .unwrap_or(false)
    }

    pub fn member_count(&self, document_id: &str) -> usize {
        self.rooms.get(document_id).map(|room| room.len()).unwrap_or(0)
    }

    /// Inverse of [`Self::list`]: every document `user_id` currently
    /// belongs to.
    pub fn documents_for_user(&self, user_id: &str) -> Vec<String> {
        self.user_documents
            .get(user_id)
            .map(|docs| docs.iter().map(|d| d.clone()).collect())
            .unwrap_or_default()
    }

    /// Gates a subscribe to any of the four destination patterns (spec
    /// §4.4/§6). Joining is triggered by the first non-cursor subscription;
    /// a cursor-only subscriber is authorized but not admitted to presence
    /// until [`Self::relay_cursor`] admits them.
    pub fn authorize_subscription(
        &self,
        path: &SubscriptionPath,
        user_id: &str,
        user_name: &str,
    ) -> CollabResult<()> {
        let document_id = path.document_id();
        self.authorize(document_id, user_id)?;
        if !matches!(path, SubscriptionPath::Cursors(_)) {
            self.admit(document_id, user_id, user_name);
        }
        Ok(())
    }

    /// Validates membership (admitting on first cursor if authorized),
    /// stamps a deterministic color, and returns the cursor event to fan
    /// out to `/<documentId>/cursors`.
    pub fn relay_cursor(
        &self,
        document_id: &str,
        user_id: &str,
        user_name: &str,
        position: Option<usize>,
    ) -> CollabResult<Cursor> {
        self.authorize(document_id, user_id)?;
        self.admit(document_id, user_id, user_name);
        Ok(Cursor {
            user_id: user_id.to_string(),
            document_id: document_id.to_string(),
            position,
            user_name: user_name.to_string(),
            color: cursor_color(user_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collab_store::{DocumentStore, InMemoryDocumentStore};
    use collab_types::Document;
    use std::sync::Arc;

    fn manager_with_store() -> (RoomManager, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.seed(Document::new("d1", "Untitled", "owner"));
        let cloned = store.clone();
        let manager = RoomManager::new(Arc::new(move |doc, user| cloned.can_user_edit(doc, user)));
        (manager, store)
    }

    #[test]
    fn authorized_user_can_join_and_is_listed() {
        let (manager, _store) = manager_with_store();
        manager.join("d1", "owner", "Owner").unwrap();
        assert!(manager.is_member("d1", "owner"));
        assert_eq!(manager.list("d1").len(), 1);
        assert_eq!(manager.documents_for_user("owner"), vec!["d1".to_string()]);
    }

    #[test]
    fn unauthorized_user_cannot_join_and_creates_no_room_entry() {
        let (manager, _store) = manager_with_store();
        let result = manager.join("d1", "intruder", "Intruder");
        assert!(result.is_err());
        assert!(!manager.is_member("d1", "intruder"));
        assert_eq!(manager.member_count("d1"), 0);
    }

    #[test]
    fn leave_evicts_empty_room() {
        let (manager, _store) = manager_with_store();
        manager.join("d1", "owner", "Owner").unwrap();
        manager.leave("d1", "owner");
        assert!(!manager.is_member("d1", "owner"));
        assert_eq!(manager.member_count("d1"), 0);
    }

    #[test]
    fn disconnect_leaves_every_room() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.seed(Document::new("d1", "Untitled", "owner"));
        store.seed(Document::new("d2", "Untitled", "owner"));
        let cloned = store.clone();
        let manager = RoomManager::new(Arc::new(move |doc, user| cloned.can_user_edit(doc, user)));
        manager.join("d1", "owner", "Owner").unwrap();
        manager.join("d2", "owner", "Owner").unwrap();

        let events = manager.disconnect("owner");
        assert_eq!(events.len(), 2);
        assert!(!manager.is_member("d1", "owner"));
        assert!(!manager.is_member("d2", "owner"));
    }

    #[test]
    fn cursor_relay_admits_on_first_cursor_and_stamps_color() {
        let (manager, _store) = manager_with_store();
        let cursor = manager.relay_cursor("d1", "owner", "Owner", Some(5)).unwrap();
        assert_eq!(cursor.position, Some(5));
        assert!(!cursor.color.is_empty());
        assert!(manager.is_member("d1", "owner"));
    }

    #[test]
    fn unauthorized_cursor_relay_is_denied() {
        let (manager, _store) = manager_with_store();
        assert!(manager.relay_cursor("d1", "intruder", "X", None).is_err());
    }

    #[test]
    fn cursor_only_subscription_does_not_join_presence() {
        let (manager, _store) = manager_with_store();
        manager
            .authorize_subscription(&SubscriptionPath::Cursors("d1".to_string()), "owner", "Owner")
            .unwrap();
        assert!(!manager.is_member("d1", "owner"));
    }

    #[test]
    fn operations_subscription_joins_presence() {
        let (manager, _store) = manager_with_store();
        manager
            .authorize_subscription(&SubscriptionPath::Operations("d1".to_string()), "owner", "Owner")
            .unwrap();
        assert!(manager.is_member("d1", "owner"));
    }
}
