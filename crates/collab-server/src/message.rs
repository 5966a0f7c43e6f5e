use collab_types::{Cursor, Operation, OperationKind};
use serde::{Deserialize, Serialize};

/// Everything a client can send over the socket (spec §6). Tagged the way
/// the teacher tags `CollaborationMessage`, so a malformed `type` field
/// fails to deserialize instead of silently matching the wrong variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Subscribes the connection to one of the four destination patterns
    /// (spec §4.4/§6): `path` is `/<docId>`, `/<docId>/operations`,
    /// `/<docId>/cursors`, or `/<docId>/users`.
    Subscribe {
        path: String,
        user_id: String,
        user_name: Option<String>,
    },
    /// An edit submission. `operationId` is never read here; the session
    /// assigns it (spec §6).
    Edit {
        document_id: String,
        user_id: String,
        user_name: Option<String>,
        operation: InboundOperation,
    },
    /// A cursor position update.
    Cursor {
        document_id: String,
        user_id: String,
        user_name: Option<String>,
        position: Option<usize>,
    },
}

/// The wire shape of an operation before it has been assigned a server id.
/// Mirrors spec §6's `{type, content?, length?, position, baseVersion?}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InboundOperation {
    #[serde(rename = "type")]
    pub kind: InboundOperationKind,
    pub content: Option<String>,
    pub length: Option<usize>,
    pub position: usize,
    pub base_version: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InboundOperationKind {
    Insert,
    Delete,
}

impl InboundOperation {
    pub fn into_kind(self) -> Result<OperationKind, String> {
        match self.kind {
            InboundOperationKind::Insert => Ok(OperationKind::Insert {
                content: self.content.ok_or("INSERT requires content")?,
                position: self.position,
            }),
            InboundOperationKind::Delete => Ok(OperationKind::Delete {
                length: self.length.ok_or("DELETE requires length")?,
                position: self.position,
            }),
        }
    }
}

/// Everything the server fans out to subscribers (spec §6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// `/<docId>/operations`.
    Operation {
        operation: Operation,
        document_id: String,
        user_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// `/<docId>/cursors`.
    CursorUpdate(Cursor),
    /// `/<docId>/users`, `user_joined` variant.
    UserJoined {
        document_id: String,
        user_id: String,
        user_name: String,
        user_count: usize,
    },
    /// `/<docId>/users`, `user_left` variant.
    UserLeft {
        document_id: String,
        user_id: String,
        user_count: usize,
    },
    /// `/<docId>/users`, initial membership snapshot on subscribe.
    UsersList {
        document_id: String,
        users: Vec<collab_rooms::MemberInfo>,
    },
    /// Surfaced to the submitter only; never broadcast (spec §7).
    Error { message: String, code: String },
}

impl From<collab_rooms::PresenceEvent> for OutboundMessage {
    fn from(event: collab_rooms::PresenceEvent) -> Self {
        match event {
            collab_rooms::PresenceEvent::UserJoined {
                document_id,
                user_id,
                user_name,
                user_count,
            } => OutboundMessage::UserJoined {
                document_id,
                user_id,
                user_name,
                user_count,
            },
            collab_rooms::PresenceEvent::UserLeft {
                document_id,
                user_id,
                user_count,
            } => OutboundMessage::UserLeft {
                document_id,
                user_id,
                user_count,
            },
        }
    }
}

impl OutboundMessage {
    pub fn error(err: &collab_errors::CollabError) -> Self {
        OutboundMessage::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}
