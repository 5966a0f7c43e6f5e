//! Unified error type for the collaborative editing core.
//!
//! Every crate in this workspace returns [`CollabError`] (aliased as
//! [`CollabResult`]) so callers at the wire boundary can match on a single
//! set of variants instead of threading per-crate error types through the
//! session, room, and version layers.

/// Result alias used across the collaboration crates.
pub type CollabResult<T> = std::result::Result<T, CollabError>;

/// The error kinds a client-facing surface needs to distinguish, per the
/// error handling design: each variant maps to exactly one propagation
/// policy (surfaced to the submitter, logged, or both).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CollabError {
    /// Structural validation failure at session ingress (bad INSERT/DELETE
    /// shape). Surfaced to the submitter, never broadcast.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// `canEdit` denied a subscribe or an edit submission.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Dereference of a document id that does not exist or is deleted.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Version creation where normalized new content equals the latest
    /// version and there are no unversioned changes to fold in.
    #[error("no changes to version: {0}")]
    NoChanges(String),

    /// A storage write failed after the in-memory application already
    /// succeeded. Callers should log, continue, and still broadcast; this
    /// variant exists so that policy is explicit rather than improvised at
    /// each call site.
    #[error("transient persistence failure: {0}")]
    TransientPersistenceFailure(String),

    /// Anything else. Logged; the submitter receives a generic failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CollabError {
    /// Short machine-readable code, used on the wire (`Error { code, .. }`)
    /// so clients can branch without parsing the display string.
    pub fn code(&self) -> &'static str {
        match self {
            CollabError::InvalidOperation(_) => "INVALID_OPERATION",
            CollabError::Unauthorized(_) => "UNAUTHORIZED",
            CollabError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            CollabError::NoChanges(_) => "NO_CHANGES",
            CollabError::TransientPersistenceFailure(_) => "TRANSIENT_PERSISTENCE_FAILURE",
            CollabError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error should ever be logged at `error` level by a
    /// caller. `DOCUMENT_NOT_FOUND` and `UNAUTHORIZED` are routine and
    /// should not spam logs (spec policy: "surfaced, not logged as error").
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            CollabError::DocumentNotFound(_) | CollabError::Unauthorized(_)
        )
    }
}

impl From<rusqlite::Error> for CollabError {
    fn from(err: rusqlite::Error) -> Self {
        CollabError::TransientPersistenceFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            CollabError::InvalidOperation("x".into()).code(),
            "INVALID_OPERATION"
        );
        assert_eq!(CollabError::Internal("x".into()).code(), "INTERNAL");
    }

    #[test]
    fn routine_errors_are_not_logged_as_errors() {
        assert!(CollabError::DocumentNotFound("d1".into()).is_routine());
        assert!(CollabError::Unauthorized("u1".into()).is_routine());
        assert!(!CollabError::Internal("x".into()).is_routine());
    }
}
