use serde::Serialize;

/// Presence notifications fanned out to `/<documentId>/users` (spec §4.4,
/// §6). Tagged the same way the operation/cursor wire types are, so the
/// server can forward these straight to `serde_json::to_string`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    UserJoined {
        document_id: String,
        user_id: String,
        user_name: String,
        user_count: usize,
    },
    UserLeft {
        document_id: String,
        user_id: String,
        user_count: usize,
    },
}
