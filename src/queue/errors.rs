//! # Queue Errors
//!
//! Error types for the queue view. Absence is never an error: a missing
//! index, a topic not found before the tail, or a caught-up cursor are all
//! `Ok(None)`.

use thiserror::Error;

use crate::log::LogError;
use crate::replication::ReplicationError;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue view errors
#[derive(Debug, Error)]
pub enum QueueError {
    // ==================
    // Caller Errors
    // ==================
    /// Local write on a sink
    #[error("Write forbidden: {0}")]
    WriteForbidden(String),

    /// Operation is not supported by this view
    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    /// Topic or message could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    // ==================
    // Collaborator Errors
    // ==================
    /// Underlying log failure
    #[error(transparent)]
    Log(#[from] LogError),

    /// Replication setup or transport failure
    #[error(transparent)]
    Replication(#[from] ReplicationError),

    /// Malformed queue configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ==================
    // Internal Errors
    // ==================
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub fn is_write_forbidden(&self) -> bool {
        matches!(self, Self::WriteForbidden(_))
    }

    pub fn is_unimplemented(&self) -> bool {
        matches!(self, Self::Unimplemented(_))
    }

    /// Seek gave up waiting on storage.
    pub fn is_seek_timeout(&self) -> bool {
        matches!(self, Self::Log(e) if e.is_seek_timeout())
    }
}
