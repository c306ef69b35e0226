//! Durable log subsystem
//!
//! The log is the only shared mutable resource under a queue view.
//! It owns record storage, index assignment and durability; everything
//! above it works through cursors.
//!
//! # Guarantees
//!
//! - Indices are unique and strictly increasing, starting at 0
//! - Indices are never reused, not even after `clear`
//! - Every record carries a CRC32 checksum
//! - Corruption halts the open; there is no repair
//!
//! Two implementations ship: `FileLog` (durable, one append-only file)
//! and `MemoryLog` (volatile).

mod checksum;
mod cursor;
mod errors;
mod file;
mod memory;
mod record;

use std::fmt::Write;

pub use checksum::{compute_checksum, verify_checksum};
pub use cursor::{Appender, Log, Tailer};
pub use errors::{LogError, LogErrorCode, LogResult, Severity};
pub use file::{FileLog, FileLogConfig, LOG_FILE_NAME};
pub use memory::MemoryLog;
pub use record::{LogRecord, MAX_RECORD_LEN, RECORD_OVERHEAD};

/// Renders records as one line each, after a header line naming the source.
pub(crate) fn render_dump<'a>(
    source: &str,
    base_index: u64,
    records: impl Iterator<Item = &'a LogRecord>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# log: {} base_index: {}", source, base_index);
    for record in records {
        let _ = writeln!(
            out,
            "{}: {} = {}",
            record.index,
            record.event_name,
            String::from_utf8_lossy(&record.value)
        );
    }
    out
}
