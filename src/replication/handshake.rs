//! Catch-up handshake
//!
//! A sink registers one listener against the connection manager of its
//! source host. Every (re)connect produces one resume request on the
//! outbound queue; disconnects are ignored. A failed send is picked up by
//! the next reconnect.
//!
//! The listener runs on the transport's thread. It never touches a cursor:
//! the resume point is the larger of the index read when the handshake was
//! armed and the log's current last index.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{ReplicationError, ReplicationResult};
use super::transport::{ConnectionManager, OutboundPublisher};
use crate::log::{compute_checksum, Log};
use crate::observability::{Event, Logger, QueueMetrics};

/// Name of the source-side handler the resume request is addressed to
pub const HANDLER_NAME: &str = "queue-replication-handler";

/// Stable channel id of the replication handler.
pub fn handler_cid() -> u64 {
    u64::from(compute_checksum(HANDLER_NAME.as_bytes()))
}

/// Ask the source for every record after `last_index_received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRequest {
    /// `-1` means from the beginning
    pub last_index_received: i64,
    pub is_sink: bool,
}

impl ResumeRequest {
    /// Sink-side request resuming after `last_index`.
    pub fn new(last_index: Option<u64>) -> Self {
        Self {
            last_index_received: index_or_start(last_index),
            is_sink: true,
        }
    }
}

/// One message addressed to a handler on the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Content path of the resource, e.g. `/orders`
    pub csp: String,
    /// Handler channel id
    pub cid: u64,
    pub handler: ResumeRequest,
}

impl Frame {
    /// Resume request for `csp` on the replication handler channel.
    pub fn resume(csp: impl Into<String>, request: ResumeRequest) -> Self {
        Self {
            csp: csp.into(),
            cid: handler_cid(),
            handler: request,
        }
    }

    /// Wire form (JSON).
    pub fn to_bytes(&self) -> ReplicationResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ReplicationError::encoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> ReplicationResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ReplicationError::encoding(e.to_string()))
    }
}

/// Wire form of a log position: `-1` for none, saturating at `i64::MAX`.
fn index_or_start(index: Option<u64>) -> i64 {
    index.map_or(-1, |i| i64::try_from(i).unwrap_or(i64::MAX))
}

/// An armed catch-up listener.
#[derive(Debug, Clone)]
pub struct CatchUpHandshake {
    csp: String,
    source_host_id: u8,
    armed_request: ResumeRequest,
}

impl CatchUpHandshake {
    /// Register the resume listener with `manager`.
    ///
    /// `last_index_appended` is the sink's position when the view was
    /// built (`None` when it has not appended anything).
    pub fn arm(
        csp: &str,
        last_index_appended: Option<u64>,
        log: Arc<dyn Log>,
        manager: &dyn ConnectionManager,
        metrics: Arc<QueueMetrics>,
    ) -> Self {
        let armed_request = ResumeRequest::new(last_index_appended);
        let source_host_id = manager.remote_host_id();

        let listener_csp = csp.to_string();
        let armed_index = armed_request.last_index_received;
        manager.add_listener(Box::new(move |publisher: &OutboundPublisher, connected: bool| {
            if !connected {
                return;
            }
            let resume_from = armed_index.max(index_or_start(log.last_index()));
            send_resume(publisher, &listener_csp, resume_from, &metrics);
        }));

        let source = source_host_id.to_string();
        let last = armed_request.last_index_received.to_string();
        Logger::event(
            Event::CatchupArmed,
            &[
                ("csp", csp),
                ("last_index_received", last.as_str()),
                ("source_host_id", source.as_str()),
            ],
        );

        Self {
            csp: csp.to_string(),
            source_host_id,
            armed_request,
        }
    }

    pub fn csp(&self) -> &str {
        &self.csp
    }

    pub fn source_host_id(&self) -> u8 {
        self.source_host_id
    }

    /// The request as computed when the listener was armed
    pub fn armed_request(&self) -> ResumeRequest {
        self.armed_request
    }
}

fn send_resume(publisher: &OutboundPublisher, csp: &str, resume_from: i64, metrics: &QueueMetrics) {
    let frame = Frame::resume(
        csp,
        ResumeRequest {
            last_index_received: resume_from,
            is_sink: true,
        },
    );
    let peer = publisher.peer_host_id().to_string();
    let last = resume_from.to_string();
    match publisher.publish(frame) {
        Ok(()) => {
            metrics.increment_resume_requests_sent();
            Logger::event(
                Event::CatchupResumeSent,
                &[("csp", csp), ("last_index_received", last.as_str()), ("peer", peer.as_str())],
            );
        }
        Err(err) => {
            let reason = err.to_string();
            Logger::event(
                Event::CatchupResumeFailed,
                &[("csp", csp), ("peer", peer.as_str()), ("reason", reason.as_str())],
            );
        }
    }
}
