use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Active,
    Deleted,
}

/// A collaboratively edited document. `content` and `updated_at` are the
/// only fields an edit mutates; `collaborator_ids` changes only via the
/// out-of-scope collaborator-management surface (§1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub owner_id: String,
    pub collaborator_ids: HashSet<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            owner_id: owner_id.into(),
            collaborator_ids: HashSet::new(),
            status: DocumentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner or collaborator, and the document must still be active. This
    /// is the predicate behind `canEdit` (§4.4); the document store is the
    /// authority, this is the pure check it applies.
    pub fn can_user_edit(&self, user_id: &str) -> bool {
        self.status == DocumentStatus::Active
            && (self.owner_id == user_id || self.collaborator_ids.contains(user_id))
    }
}
