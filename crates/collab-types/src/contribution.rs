use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-`(document_id, user_id)` aggregate, incremented whenever a version
/// is created that folds in that user's changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserContribution {
    pub document_id: String,
    pub user_id: String,
    pub edit_count: u64,
    pub characters_added: u64,
    pub characters_deleted: u64,
    pub first_contribution: DateTime<Utc>,
    pub last_contribution: DateTime<Utc>,
}

impl UserContribution {
    pub fn new(document_id: impl Into<String>, user_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            document_id: document_id.into(),
            user_id: user_id.into(),
            edit_count: 0,
            characters_added: 0,
            characters_deleted: 0,
            first_contribution: at,
            last_contribution: at,
        }
    }

    pub fn record(&mut self, characters_added: u64, characters_deleted: u64, at: DateTime<Utc>) {
        self.edit_count += 1;
        self.characters_added += characters_added;
        self.characters_deleted += characters_deleted;
        self.last_contribution = at;
    }
}
