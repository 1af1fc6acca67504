//! Typed errors for the control plane.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match on
//! the kind of failure. Backend errors are boxed so the enum does not depend on
//! which storage features are compiled in.

use thiserror::Error;

/// Boxed backend error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during control-plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The addressed entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation on a durable insert
    #[error("conflict: {0}")]
    Conflict(String),

    /// State that should be impossible
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Caller supplied an unusable value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Redis command or connection failure
    #[error("redis error: {0}")]
    Redis(#[source] BoxError),

    /// Relational store failure
    #[error("database error: {0}")]
    Database(#[source] BoxError),

    /// Worker observation could not be read
    #[error("monitor error: {0}")]
    Monitor(#[source] BoxError),

    /// Blob store failure
    #[error("blob store error: {0}")]
    BlobStore(#[source] BoxError),

    /// Another actor drained the pending queue concurrently
    #[error("no job in the queue removed")]
    NoJobRemoved,

    /// The request context was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A cleanup selector failed; counts cover what was deleted before it
    #[error("cleanup aborted after deleting {deleted} artifacts ({reclaimed_bytes} bytes): {source}")]
    CleanupAborted {
        deleted: i64,
        reclaimed_bytes: i64,
        #[source]
        source: Box<ControlError>,
    },
}

impl ControlError {
    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ControlError::Redis(_)
                | ControlError::Database(_)
                | ControlError::Monitor(_)
                | ControlError::BlobStore(_)
        )
    }

    /// Returns `true` for [`ControlError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlError::NotFound(_))
    }

    pub(crate) fn redis(err: impl Into<BoxError>) -> Self {
        ControlError::Redis(err.into())
    }

    pub(crate) fn database(err: impl Into<BoxError>) -> Self {
        ControlError::Database(err.into())
    }

    pub(crate) fn monitor(err: impl Into<BoxError>) -> Self {
        ControlError::Monitor(err.into())
    }

    pub(crate) fn blob(err: impl Into<BoxError>) -> Self {
        ControlError::BlobStore(err.into())
    }
}

/// Result type alias for control-plane operations.
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_are_transient() {
        assert!(ControlError::redis("connection reset").is_transient());
        assert!(ControlError::database("pool timed out").is_transient());
        assert!(!ControlError::NotFound("schedule 1".into()).is_transient());
        assert!(!ControlError::NoJobRemoved.is_transient());
    }

    #[test]
    fn no_job_removed_message() {
        assert_eq!(
            ControlError::NoJobRemoved.to_string(),
            "no job in the queue removed"
        );
    }

    #[test]
    fn cleanup_aborted_keeps_partial_counts() {
        let err = ControlError::CleanupAborted {
            deleted: 1,
            reclaimed_bytes: 100,
            source: Box::new(ControlError::database("selector failed")),
        };
        assert!(err.to_string().contains("1 artifacts (100 bytes)"));
    }
}
