//! queueview - topic-addressed view over an append-only log
//!
//! - `log`: durable and in-memory logs, cursors, record checksums
//! - `queue`: the queue view, per-thread cursors, topic codec, configuration
//! - `replication`: source/sink roles and the catch-up handshake
//! - `observability`: structured logging and counters
//! - `cli`: the `queueview` command-line tool

pub mod cli;
pub mod log;
pub mod observability;
pub mod queue;
pub mod replication;
