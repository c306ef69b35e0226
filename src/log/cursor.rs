//! Log and cursor capabilities
//!
//! A `Log` is the single shared resource; everything else reaches it
//! through cursors. Cursors are owned by exactly one caller at a time and
//! carry their own position, so they are `Send` but never shared.

use std::fmt;

use super::errors::LogResult;
use super::record::LogRecord;

/// Append-only, strictly ordered log of records.
pub trait Log: Send + Sync + fmt::Debug {
    /// Create a new write cursor.
    fn create_appender(&self) -> LogResult<Box<dyn Appender>>;

    /// Create a new, independent read cursor positioned at the first index.
    fn create_tailer(&self) -> LogResult<Box<dyn Tailer>>;

    /// Index of the oldest record, `None` when the log is empty.
    fn first_index(&self) -> Option<u64>;

    /// Index of the newest record, `None` when the log is empty.
    fn last_index(&self) -> Option<u64>;

    /// Remove every record. Indices are never reused afterwards.
    fn clear(&self) -> LogResult<()>;

    /// Human-readable rendering of every record.
    fn dump(&self) -> LogResult<String>;

    /// Release the log. Calling this more than once is a no-op.
    fn close(&self) -> LogResult<()>;

    /// Whether `close` has been called.
    fn is_closed(&self) -> bool;
}

/// Write cursor.
pub trait Appender: Send {
    /// Append one record and return the index the log assigned to it.
    ///
    /// The record is committed when this returns `Ok`; on error nothing
    /// becomes visible to readers.
    fn append(&mut self, event_name: &str, value: &[u8]) -> LogResult<u64>;

    /// Index of the last record written through this cursor.
    fn last_index_appended(&self) -> Option<u64>;
}

/// Read cursor.
pub trait Tailer: Send {
    /// Read the record at the current position and advance past it.
    ///
    /// `Ok(None)` means the cursor is at the tail; it is not an error and a
    /// later call may return a record appended in the meantime.
    fn read_next(&mut self) -> LogResult<Option<LogRecord>>;

    /// Position the cursor so the next read returns `index`.
    ///
    /// Returns `Ok(false)` and leaves the cursor unchanged when `index` is
    /// not present. Implementations that have to wait on storage may fail
    /// with a seek timeout.
    fn move_to_index(&mut self, index: u64) -> LogResult<bool>;

    /// Index the next read will return.
    fn index(&self) -> u64;

    /// Position the cursor at the first index.
    fn to_start(&mut self);
}
