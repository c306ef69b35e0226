//! Replication error types
//!
//! Missing collaborators are not errors: they switch replication off.
//! Everything reported here is either a malformed setup (fatal at
//! construction) or a transient transport problem.

use std::fmt;

/// Replication error type
#[derive(Debug, Clone)]
pub struct ReplicationError {
    /// Error kind
    pub kind: ReplicationErrorKind,
    /// Error message
    pub message: String,
}

/// Replication error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationErrorKind {
    /// Directory or cluster setup is malformed
    ConfigurationError,

    /// Local write attempted on a sink
    WriteRejected,

    /// Replicated record skipped ahead of the expected index
    IndexGap,

    /// Outbound frame could not be handed to the transport
    SendFailed,

    /// Frame could not be encoded or decoded
    Encoding,
}

impl ReplicationError {
    /// Create a new replication error.
    pub fn new(kind: ReplicationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::ConfigurationError, message)
    }

    /// Create a write rejected error.
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::WriteRejected, message)
    }

    /// Create an index gap error.
    pub fn index_gap(expected: u64, received: u64) -> Self {
        Self::new(
            ReplicationErrorKind::IndexGap,
            format!(
                "replicated index gap: expected {}, received {}",
                expected, received
            ),
        )
    }

    /// Create a send failed error.
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::SendFailed, message)
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new(ReplicationErrorKind::Encoding, message)
    }

    /// Transient errors are retried by the next reconnect.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ReplicationErrorKind::SendFailed)
    }

    /// Fatal errors prevent the view from being constructed or continuing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ReplicationErrorKind::ConfigurationError | ReplicationErrorKind::IndexGap
        )
    }
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicationError({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for ReplicationError {}

/// Result type for replication operations
pub type ReplicationResult<T> = Result<T, ReplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(ReplicationError::configuration_error("no cluster").is_fatal());
        assert!(ReplicationError::index_gap(3, 7).is_fatal());
    }

    #[test]
    fn test_send_failure_is_transient() {
        let err = ReplicationError::send_failed("channel closed");
        assert!(err.is_transient());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_gap_message() {
        let err = ReplicationError::index_gap(3, 7);
        assert!(err.message.contains("expected 3"));
        assert!(err.to_string().contains("IndexGap"));
    }
}
