//! Volatile in-memory log
//!
//! Same contract as the file-backed log without durability. Used for
//! ephemeral queues and in tests.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::cursor::{Appender, Log, Tailer};
use super::errors::{LogError, LogResult};
use super::record::LogRecord;

#[derive(Debug, Default)]
struct MemoryState {
    /// Index of `records[0]`
    base_index: u64,
    records: Vec<LogRecord>,
    closed: bool,
}

impl MemoryState {
    fn next_index(&self) -> u64 {
        self.base_index + self.records.len() as u64
    }

    fn get(&self, index: u64) -> Option<&LogRecord> {
        index
            .checked_sub(self.base_index)
            .and_then(|pos| self.records.get(pos as usize))
    }
}

/// In-memory log shared by all of its cursors.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LogResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| LogError::corruption("memory log lock poisoned"))
    }

    fn write(&self) -> LogResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| LogError::corruption("memory log lock poisoned"))
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.read().map(|s| s.records.len()).unwrap_or(0)
    }

    /// Whether the log holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Log for MemoryLog {
    fn create_appender(&self) -> LogResult<Box<dyn Appender>> {
        if self.read()?.closed {
            return Err(LogError::closed());
        }
        Ok(Box::new(MemoryAppender {
            log: self.clone(),
            last_appended: None,
        }))
    }

    fn create_tailer(&self) -> LogResult<Box<dyn Tailer>> {
        let state = self.read()?;
        if state.closed {
            return Err(LogError::closed());
        }
        Ok(Box::new(MemoryTailer {
            log: self.clone(),
            next: state.base_index,
        }))
    }

    fn first_index(&self) -> Option<u64> {
        let state = self.read().ok()?;
        state.records.first().map(|r| r.index)
    }

    fn last_index(&self) -> Option<u64> {
        let state = self.read().ok()?;
        state.records.last().map(|r| r.index)
    }

    fn clear(&self) -> LogResult<()> {
        let mut state = self.write()?;
        if state.closed {
            return Err(LogError::closed());
        }
        let next = state.next_index();
        state.base_index = next;
        state.records.clear();
        Ok(())
    }

    fn dump(&self) -> LogResult<String> {
        let state = self.read()?;
        Ok(super::render_dump(
            "memory",
            state.base_index,
            state.records.iter(),
        ))
    }

    fn close(&self) -> LogResult<()> {
        self.write()?.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.read().map(|s| s.closed).unwrap_or(true)
    }
}

struct MemoryAppender {
    log: MemoryLog,
    last_appended: Option<u64>,
}

impl Appender for MemoryAppender {
    fn append(&mut self, event_name: &str, value: &[u8]) -> LogResult<u64> {
        let mut state = self.log.write()?;
        if state.closed {
            return Err(LogError::closed());
        }
        let index = state.next_index();
        state
            .records
            .push(LogRecord::new(index, event_name, value.to_vec()));
        self.last_appended = Some(index);
        Ok(index)
    }

    fn last_index_appended(&self) -> Option<u64> {
        self.last_appended
    }
}

struct MemoryTailer {
    log: MemoryLog,
    next: u64,
}

impl Tailer for MemoryTailer {
    fn read_next(&mut self) -> LogResult<Option<LogRecord>> {
        let state = self.log.read()?;
        if state.closed {
            return Err(LogError::closed());
        }
        // Records before base were cleared; skip forward.
        if self.next < state.base_index {
            self.next = state.base_index;
        }
        match state.get(self.next) {
            Some(record) => {
                self.next += 1;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    fn move_to_index(&mut self, index: u64) -> LogResult<bool> {
        let state = self.log.read()?;
        if state.closed {
            return Err(LogError::closed());
        }
        if state.get(index).is_none() {
            return Ok(false);
        }
        self.next = index;
        Ok(true)
    }

    fn index(&self) -> u64 {
        self.next
    }

    fn to_start(&mut self) {
        self.next = self.log.read().map(|s| s.base_index).unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_start_at_zero() {
        let log = MemoryLog::new();
        let mut appender = log.create_appender().unwrap();
        assert_eq!(appender.append("a", b"1").unwrap(), 0);
        assert_eq!(appender.append("b", b"2").unwrap(), 1);
        assert_eq!(appender.last_index_appended(), Some(1));
        assert_eq!(log.first_index(), Some(0));
        assert_eq!(log.last_index(), Some(1));
    }

    #[test]
    fn test_tailer_reads_in_order_then_none() {
        let log = MemoryLog::new();
        let mut appender = log.create_appender().unwrap();
        appender.append("a", b"1").unwrap();
        appender.append("b", b"2").unwrap();

        let mut tailer = log.create_tailer().unwrap();
        assert_eq!(tailer.read_next().unwrap().unwrap().index, 0);
        assert_eq!(tailer.read_next().unwrap().unwrap().index, 1);
        assert!(tailer.read_next().unwrap().is_none());

        appender.append("c", b"3").unwrap();
        assert_eq!(tailer.read_next().unwrap().unwrap().event_name, "c");
    }

    #[test]
    fn test_move_to_missing_index_keeps_position() {
        let log = MemoryLog::new();
        log.create_appender().unwrap().append("a", b"1").unwrap();

        let mut tailer = log.create_tailer().unwrap();
        assert!(!tailer.move_to_index(5).unwrap());
        assert_eq!(tailer.index(), 0);
        assert!(tailer.move_to_index(0).unwrap());
    }

    #[test]
    fn test_clear_does_not_reuse_indices() {
        let log = MemoryLog::new();
        let mut appender = log.create_appender().unwrap();
        appender.append("a", b"1").unwrap();
        appender.append("a", b"2").unwrap();

        log.clear().unwrap();
        assert_eq!(log.first_index(), None);
        assert_eq!(log.last_index(), None);
        assert_eq!(appender.append("a", b"3").unwrap(), 2);
        assert_eq!(log.first_index(), Some(2));
    }

    #[test]
    fn test_closed_log_rejects_cursors() {
        let log = MemoryLog::new();
        let mut tailer = log.create_tailer().unwrap();
        log.close().unwrap();
        log.close().unwrap();

        assert!(log.is_closed());
        assert!(log.create_appender().err().unwrap().is_closed());
        assert!(tailer.read_next().unwrap_err().is_closed());
    }
}
