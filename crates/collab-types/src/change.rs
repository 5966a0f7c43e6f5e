use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Delete,
    Update,
}

/// A persistent record of one applied operation. Created on every applied
/// operation that was not a no-op (§4.3); bound to a version once one is
/// created that covers it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub change_type: ChangeType,
    /// For INSERT, the inserted text; for DELETE, the text that was
    /// removed (captured from document content before the delete was
    /// applied). Contribution aggregation and diff attribution both key
    /// off this field, so a DELETE entry must carry it, not `None`.
    pub content: Option<String>,
    pub position: usize,
    pub timestamp: DateTime<Utc>,
    pub version_id: Option<String>,
}
