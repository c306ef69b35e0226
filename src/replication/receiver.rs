//! Replicated record ordering
//!
//! Records streamed from the source must arrive in index order with no
//! holes. Records at or below the last applied index are duplicates from
//! an overlapping resume and are dropped. A record past the expected
//! index is a gap: the sink is missing history and must stop applying.

use serde::{Deserialize, Serialize};

use super::errors::{ReplicationError, ReplicationResult};
use super::handshake::ResumeRequest;

/// One record as streamed by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatedRecord {
    /// Index on the source
    pub index: u64,
    pub event_name: String,
    pub value: Vec<u8>,
}

/// Result of receiving a replicated record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveResult {
    /// Record is next in order
    Accepted,

    /// Already applied
    Duplicate,

    /// Record skips ahead
    GapDetected { expected: u64, received: u64 },
}

impl ReceiveResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Self::GapDetected { .. })
    }

    /// Gaps are errors, duplicates are not.
    pub fn to_result(&self) -> ReplicationResult<()> {
        match self {
            Self::Accepted | Self::Duplicate => Ok(()),
            Self::GapDetected { expected, received } => {
                Err(ReplicationError::index_gap(*expected, *received))
            }
        }
    }
}

/// Tracks the next source index a sink expects.
#[derive(Debug, Clone)]
pub struct ReplicaReceiver {
    expected_index: u64,
}

impl ReplicaReceiver {
    /// Expect the record right after `last_index_received` (`-1` = none).
    pub fn new(last_index_received: i64) -> Self {
        Self {
            expected_index: last_index_received.saturating_add(1).max(0) as u64,
        }
    }

    /// Receiver matching the resume request it answers.
    pub fn for_request(request: &ResumeRequest) -> Self {
        Self::new(request.last_index_received)
    }

    pub fn expected_index(&self) -> u64 {
        self.expected_index
    }

    /// Classify `record` without applying it.
    pub fn receive(&self, record: &ReplicatedRecord) -> ReceiveResult {
        if record.index < self.expected_index {
            return ReceiveResult::Duplicate;
        }
        if record.index > self.expected_index {
            return ReceiveResult::GapDetected {
                expected: self.expected_index,
                received: record.index,
            };
        }
        ReceiveResult::Accepted
    }

    /// Mark `record` applied.
    pub fn apply(&mut self, record: &ReplicatedRecord) {
        self.expected_index = record.index.saturating_add(1);
    }
}
