use serde::{Deserialize, Serialize};

/// The atomic unit of edit intent.
///
/// Positions and lengths are Unicode scalar value (`char`) offsets into the
/// document content, not UTF-8 byte offsets and not UTF-16 code units. This
/// is enforced everywhere a position crosses the wire boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationKind {
    /// Inserts `content` before the char index `position` in the current
    /// document.
    Insert { content: String, position: usize },
    /// Removes `length` characters starting at `position`.
    Delete { length: usize, position: usize },
    /// No-op marker. Never broadcast, never persisted; produced only as an
    /// internal transform identity and accepted as a transform input for
    /// completeness of the algebra.
    Retain { length: usize },
}

impl OperationKind {
    pub fn is_retain(&self) -> bool {
        matches!(self, OperationKind::Retain { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, OperationKind::Delete { .. })
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, OperationKind::Insert { .. })
    }
}

/// A fully addressed operation: the wire/storage representation.
///
/// `operation_id` is assigned by the document session (§4.2) and is `None`
/// only for an operation fresh off the wire that has not yet passed through
/// ingest. `base_version` is always `0` for every client in this system
/// (see `spec` §4.1) — it is carried for protocol completeness, not because
/// clients ever diverge from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub user_id: String,
    pub document_id: String,
    pub operation_id: Option<u64>,
    pub base_version: u64,
}

impl Operation {
    pub fn new(
        kind: OperationKind,
        user_id: impl Into<String>,
        document_id: impl Into<String>,
        base_version: u64,
    ) -> Self {
        Self {
            kind,
            user_id: user_id.into(),
            document_id: document_id.into(),
            operation_id: None,
            base_version,
        }
    }

    /// Validates structural invariants from the data model: an INSERT has
    /// non-empty-typed content and a valid position, a DELETE has a
    /// positive length and a non-negative position. `usize` already rules
    /// out negative values, so this only needs to check the DELETE length.
    pub fn validate(&self) -> Result<(), String> {
        match &self.kind {
            OperationKind::Insert { .. } => Ok(()),
            OperationKind::Delete { length, .. } => {
                if *length == 0 {
                    Err("DELETE length must be greater than 0".to_string())
                } else {
                    Ok(())
                }
            }
            OperationKind::Retain { .. } => Ok(()),
        }
    }

    /// Tie-break key: `operation_id` when present, falling back to
    /// `user_id` otherwise. This ordering must stay total and deterministic
    /// across every node, per the transformation rules.
    pub fn order_key(&self) -> OrderKey<'_> {
        match self.operation_id {
            Some(id) => OrderKey::OperationId(id),
            None => OrderKey::UserId(&self.user_id),
        }
    }
}

/// Comparable tie-break key. `OperationId` always sorts by its numeric
/// value; two `UserId` keys compare lexically; an `OperationId` is always
/// considered earlier than a bare `UserId` fallback, since an assigned
/// server id is always the more reliable source of order (spec §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderKey<'a> {
    OperationId(u64),
    UserId(&'a str),
}

impl<'a> OrderKey<'a> {
    pub fn is_earlier_than(&self, other: &OrderKey<'a>) -> bool {
        use OrderKey::*;
        match (self, other) {
            (OperationId(a), OperationId(b)) => a < b,
            (UserId(a), UserId(b)) => a < b,
            (OperationId(_), UserId(_)) => true,
            (UserId(_), OperationId(_)) => false,
        }
    }
}
