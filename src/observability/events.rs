//! Observable events
//!
//! Every lifecycle step of a queue view and its replication handshake
//! logs one of these names.

use std::fmt;

use super::logger::Severity;

/// Observable queue and replication events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// View constructed and ready
    QueueViewOpened,
    /// View closed
    QueueViewClosed,
    /// All records removed
    QueueCleared,

    // Writes
    /// Local publish refused on a sink
    WriteRejected,

    // Replication
    /// Host identity or queue source missing, replication off
    ReplicationDisabled,
    /// Role decided
    ReplicationRoleResolved,
    /// Connection listener registered against the source
    CatchupArmed,
    /// Resume request handed to the transport
    CatchupResumeSent,
    /// Resume request could not be handed off
    CatchupResumeFailed,
    /// Replicated record skipped ahead of the expected index
    ReplicaGapDetected,

    // Storage
    /// Log failed validation
    LogCorruption,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueueViewOpened => "QUEUE_VIEW_OPENED",
            Event::QueueViewClosed => "QUEUE_VIEW_CLOSED",
            Event::QueueCleared => "QUEUE_CLEARED",
            Event::WriteRejected => "WRITE_REJECTED",
            Event::ReplicationDisabled => "REPLICATION_DISABLED",
            Event::ReplicationRoleResolved => "REPLICATION_ROLE_RESOLVED",
            Event::CatchupArmed => "CATCHUP_ARMED",
            Event::CatchupResumeSent => "CATCHUP_RESUME_SENT",
            Event::CatchupResumeFailed => "CATCHUP_RESUME_FAILED",
            Event::ReplicaGapDetected => "REPLICA_GAP_DETECTED",
            Event::LogCorruption => "LOG_CORRUPTION",
        }
    }

    /// Default severity when logged
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReplicationDisabled => Severity::Trace,
            Event::WriteRejected | Event::CatchupResumeFailed => Severity::Warn,
            Event::ReplicaGapDetected => Severity::Error,
            Event::LogCorruption => Severity::Fatal,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::QueueViewOpened.as_str(), "QUEUE_VIEW_OPENED");
        assert_eq!(Event::CatchupResumeSent.to_string(), "CATCHUP_RESUME_SENT");
    }

    #[test]
    fn test_event_severities() {
        assert_eq!(Event::WriteRejected.severity(), Severity::Warn);
        assert_eq!(Event::LogCorruption.severity(), Severity::Fatal);
        assert_eq!(Event::CatchupArmed.severity(), Severity::Info);
    }
}
