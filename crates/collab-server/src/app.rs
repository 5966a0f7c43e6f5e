use std::sync::Arc;

use collab_rooms::RoomManager;
use collab_session::SessionManager;
use collab_store::DocumentStore;
use collab_versions::VersionManager;

use crate::config::ServerConfig;

/// Shared application state, one instance per process, cloned cheaply
/// (every field is an `Arc`) into each connection task. Composition root
/// for the whole workspace: it is the only place that knows every
/// collaboration crate exists.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub rooms: Arc<RoomManager>,
    pub versions: Arc<VersionManager>,
    pub documents: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn open(config: &ServerConfig) -> anyhow::Result<Self> {
        let conn = collab_store::open(&config.sqlite_path)?;

        let documents: Arc<dyn DocumentStore> =
            Arc::new(collab_store::SqliteDocumentStore::new(conn.clone()));
        let change_log: Arc<dyn collab_changelog::ChangeLogStore> =
            Arc::new(collab_changelog::SqliteChangeLog::new(conn.clone()));
        let version_store: Arc<dyn collab_versions::VersionStore> =
            Arc::new(collab_versions::SqliteVersionStore::new(conn.clone()));
        let contribution_store: Arc<dyn collab_versions::ContributionStore> =
            Arc::new(collab_versions::SqliteContributionStore::new(conn.clone()));

        let sessions = Arc::new(SessionManager::new(documents.clone(), change_log.clone()));

        let documents_for_auth = documents.clone();
        let rooms = Arc::new(RoomManager::new(Arc::new(move |document_id, user_id| {
            documents_for_auth.can_user_edit(document_id, user_id)
        })));

        let versions = Arc::new(VersionManager::new(
            version_store,
            contribution_store,
            change_log,
            documents.clone(),
            sessions.clone(),
        ));

        Ok(Self {
            sessions,
            rooms,
            versions,
            documents,
        })
    }
}
