use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable ordered snapshot of document content. Once created, its
/// `content`, `version_number`, `created_by`, and `created_at` never
/// change (§8 version immutability invariant).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub document_id: String,
    pub version_number: u64,
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub change_description: Option<String>,
}
