//! Queue metrics
//!
//! Counters only, monotonic, relaxed ordering.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one queue view
#[derive(Debug, Default)]
pub struct QueueMetrics {
    published: AtomicU64,
    writes_rejected: AtomicU64,
    reads: AtomicU64,
    scan_skipped: AtomicU64,
    replicated_applied: AtomicU64,
    resume_requests_sent: AtomicU64,
}

/// Point-in-time copy of `QueueMetrics`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub writes_rejected: u64,
    pub reads: u64,
    pub scan_skipped: u64,
    pub replicated_applied: u64,
    pub resume_requests_sent: u64,
}

impl QueueMetrics {
    /// Create a registry with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_writes_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reads(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records skipped by a topic scan
    pub fn add_scan_skipped(&self, n: u64) {
        self.scan_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_replicated_applied(&self) {
        self.replicated_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_resume_requests_sent(&self) {
        self.resume_requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            scan_skipped: self.scan_skipped.load(Ordering::Relaxed),
            replicated_applied: self.replicated_applied.load(Ordering::Relaxed),
            resume_requests_sent: self.resume_requests_sent.load(Ordering::Relaxed),
        }
    }

    /// Snapshot rendered as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| String::from("{}"))
    }
}
