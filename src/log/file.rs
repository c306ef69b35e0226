//! File-backed durable log
//!
//! A single append-only file:
//! - 16-byte header: magic `QVLG`, format version (u32 LE), base index (u64 LE)
//! - records in index order, see `record.rs`
//!
//! Opening re-scans the whole file. Any checksum mismatch, index
//! discontinuity or truncated record halts the open; there is no repair.
//!
//! One writer lock serializes appends, so the index handed back by an
//! appender is unique and reflects global append order. Every tailer owns
//! its own read handle and only takes the lock to look up offsets.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::cursor::{Appender, Log, Tailer};
use super::errors::{LogError, LogResult};
use super::record::{LogRecord, RECORD_OVERHEAD};

const MAGIC: &[u8; 4] = b"QVLG";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: u64 = 16;

/// File name used inside a queue directory
pub const LOG_FILE_NAME: &str = "queue.log";

/// Configuration for the file-backed log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    /// Whether every append is followed by fsync (default: true)
    pub sync_on_append: bool,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            sync_on_append: true,
        }
    }
}

#[derive(Debug)]
struct FileState {
    /// Write handle, `None` once closed
    writer: Option<File>,
    /// Index of the first record in the file
    base_index: u64,
    /// Byte offset of every record, `offsets[i]` holds index `base_index + i`
    offsets: Vec<u64>,
    /// Byte offset one past the last record
    end_offset: u64,
}

impl FileState {
    fn next_index(&self) -> u64 {
        self.base_index + self.offsets.len() as u64
    }

    fn offset_of(&self, index: u64) -> Option<u64> {
        index
            .checked_sub(self.base_index)
            .and_then(|pos| self.offsets.get(pos as usize).copied())
    }
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    config: FileLogConfig,
    state: RwLock<FileState>,
}

impl Shared {
    fn read(&self) -> LogResult<RwLockReadGuard<'_, FileState>> {
        self.state
            .read()
            .map_err(|_| LogError::corruption("file log lock poisoned"))
    }

    fn write(&self) -> LogResult<RwLockWriteGuard<'_, FileState>> {
        self.state
            .write()
            .map_err(|_| LogError::corruption("file log lock poisoned"))
    }

    fn open_reader(&self) -> LogResult<File> {
        File::open(&self.path).map_err(|e| {
            LogError::read_failed(
                format!("Failed to open log file: {}", self.path.display()),
                e,
            )
        })
    }
}

/// Durable log stored in one append-only file.
#[derive(Debug, Clone)]
pub struct FileLog {
    shared: Arc<Shared>,
}

impl FileLog {
    /// Opens or creates the log file at `path` with default configuration.
    pub fn open(path: &Path) -> LogResult<Self> {
        Self::open_with_config(path, FileLogConfig::default())
    }

    /// Opens or creates `<dir>/<name>/queue.log`.
    pub fn open_in_dir(dir: &Path, name: &str, config: FileLogConfig) -> LogResult<Self> {
        Self::open_with_config(&dir.join(name).join(LOG_FILE_NAME), config)
    }

    /// Opens or creates the log file at `path`.
    ///
    /// Creates parent directories if needed. An existing file is fully
    /// validated before the log becomes usable.
    pub fn open_with_config(path: &Path, config: FileLogConfig) -> LogResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    LogError::append_failed(
                        format!("Failed to create log directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let mut writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LogError::append_failed(format!("Failed to open log file: {}", path.display()), e)
            })?;

        let file_size = writer
            .metadata()
            .map_err(|e| LogError::read_failed("Failed to read log metadata", e))?
            .len();

        let (base_index, offsets, end_offset) = if file_size == 0 {
            write_header(&mut writer, 0)?;
            (0, Vec::new(), HEADER_LEN)
        } else {
            let mut reader = File::open(path).map_err(|e| {
                LogError::read_failed(format!("Failed to open log file: {}", path.display()), e)
            })?;
            scan(&mut reader, file_size)?
        };

        Ok(Self {
            shared: Arc::new(Shared {
                path: path.to_path_buf(),
                config,
                state: RwLock::new(FileState {
                    writer: Some(writer),
                    base_index,
                    offsets,
                    end_offset,
                }),
            }),
        })
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Returns the configuration the log was opened with.
    pub fn config(&self) -> &FileLogConfig {
        &self.shared.config
    }
}

fn write_header(writer: &mut File, base_index: u64) -> LogResult<()> {
    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    header.extend_from_slice(&base_index.to_le_bytes());

    writer
        .write_all(&header)
        .map_err(|e| LogError::append_failed("Failed to write log header", e))?;
    writer
        .sync_all()
        .map_err(|e| LogError::append_failed("fsync failed after writing log header", e))
}

/// Validates the header and every record, returning base index, record
/// offsets and end offset.
fn scan(reader: &mut File, file_size: u64) -> LogResult<(u64, Vec<u64>, u64)> {
    if file_size < HEADER_LEN {
        return Err(LogError::corruption_at_offset(
            0,
            format!("Truncated header: {} bytes", file_size),
        ));
    }

    let mut header = [0u8; HEADER_LEN as usize];
    reader
        .read_exact(&mut header)
        .map_err(|e| LogError::corruption_at_offset(0, format!("Failed to read header: {}", e)))?;

    if &header[0..4] != MAGIC {
        return Err(LogError::corruption_at_offset(0, "Bad magic"));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(LogError::corruption_at_offset(
            4,
            format!("Unsupported format version {}", version),
        ));
    }
    let mut base_buf = [0u8; 8];
    base_buf.copy_from_slice(&header[8..16]);
    let base_index = u64::from_le_bytes(base_buf);

    let mut offsets = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < file_size {
        let record = read_record_at(reader, offset, file_size)?;
        let expected = base_index + offsets.len() as u64;
        if record.index != expected {
            return Err(LogError::corruption_at_index(
                record.index,
                format!("Non-sequential index: expected {}", expected),
            ));
        }
        offsets.push(offset);
        offset += record.encoded_len() as u64;
    }

    Ok((base_index, offsets, offset))
}

/// Reads and validates the record starting at `offset`.
fn read_record_at(file: &mut File, offset: u64, end_offset: u64) -> LogResult<LogRecord> {
    let remaining = end_offset.saturating_sub(offset);
    if remaining < RECORD_OVERHEAD as u64 {
        return Err(LogError::corruption_at_offset(
            offset,
            format!(
                "Truncated log: {} bytes remaining, minimum record size is {}",
                remaining, RECORD_OVERHEAD
            ),
        ));
    }

    file.seek(SeekFrom::Start(offset))
        .map_err(|e| LogError::read_failed(format!("Failed to seek to offset {}", offset), e))?;

    let mut len_buf = [0u8; 4];
    file.read_exact(&mut len_buf).map_err(|e| {
        LogError::corruption_at_offset(offset, format!("Failed to read record length: {}", e))
    })?;
    let record_length = u32::from_le_bytes(len_buf) as u64;

    if record_length < RECORD_OVERHEAD as u64 || record_length > remaining {
        return Err(LogError::corruption_at_offset(
            offset,
            format!(
                "Record length {} invalid, {} bytes remaining",
                record_length, remaining
            ),
        ));
    }

    let mut record_buf = vec![0u8; record_length as usize];
    record_buf[0..4].copy_from_slice(&len_buf);
    file.read_exact(&mut record_buf[4..]).map_err(|e| {
        LogError::corruption_at_offset(offset, format!("Failed to read record body: {}", e))
    })?;

    let (record, _) = LogRecord::deserialize(&record_buf)
        .map_err(|e| LogError::corruption_at_offset(offset, e.to_string()))?;
    Ok(record)
}

impl Log for FileLog {
    fn create_appender(&self) -> LogResult<Box<dyn Appender>> {
        if self.shared.read()?.writer.is_none() {
            return Err(LogError::closed());
        }
        Ok(Box::new(FileAppender {
            shared: Arc::clone(&self.shared),
            last_appended: None,
        }))
    }

    fn create_tailer(&self) -> LogResult<Box<dyn Tailer>> {
        let state = self.shared.read()?;
        if state.writer.is_none() {
            return Err(LogError::closed());
        }
        let file = self.shared.open_reader()?;
        Ok(Box::new(FileTailer {
            shared: Arc::clone(&self.shared),
            file,
            next: state.base_index,
        }))
    }

    fn first_index(&self) -> Option<u64> {
        let state = self.shared.read().ok()?;
        if state.offsets.is_empty() {
            None
        } else {
            Some(state.base_index)
        }
    }

    fn last_index(&self) -> Option<u64> {
        let state = self.shared.read().ok()?;
        if state.offsets.is_empty() {
            None
        } else {
            Some(state.next_index() - 1)
        }
    }

    fn clear(&self) -> LogResult<()> {
        let mut state = self.shared.write()?;
        let next = state.next_index();
        let writer = state.writer.as_mut().ok_or_else(LogError::closed)?;

        writer
            .set_len(0)
            .map_err(|e| LogError::append_failed("Failed to truncate log", e))?;
        write_header(writer, next)?;

        state.base_index = next;
        state.offsets.clear();
        state.end_offset = HEADER_LEN;
        Ok(())
    }

    fn dump(&self) -> LogResult<String> {
        let state = self.shared.read()?;
        let mut file = self.shared.open_reader()?;

        let mut records = Vec::with_capacity(state.offsets.len());
        for &offset in &state.offsets {
            records.push(read_record_at(&mut file, offset, state.end_offset)?);
        }

        Ok(super::render_dump(
            &self.shared.path.display().to_string(),
            state.base_index,
            records.iter(),
        ))
    }

    fn close(&self) -> LogResult<()> {
        let mut state = self.shared.write()?;
        if let Some(writer) = state.writer.take() {
            writer
                .sync_all()
                .map_err(|e| LogError::append_failed("fsync failed while closing log", e))?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared
            .read()
            .map(|s| s.writer.is_none())
            .unwrap_or(true)
    }
}

/// File operations needed to append one record and undo it.
trait RecordFile: Write {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl RecordFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Writes one serialized record, optionally fsyncs, and on any failure
/// truncates back to `end_offset` so the file ends on a record boundary.
fn write_record<F: RecordFile>(
    file: &mut F,
    serialized: &[u8],
    sync: bool,
    end_offset: u64,
    index: u64,
) -> LogResult<()> {
    if let Err(e) = file.write_all(serialized) {
        let _ = file.truncate(end_offset);
        return Err(LogError::append_failed(
            format!("Failed to write log record at index {}", index),
            e,
        ));
    }

    if sync {
        if let Err(e) = file.sync() {
            let _ = file.truncate(end_offset);
            return Err(LogError::append_failed(
                format!("fsync failed after log append at index {}", index),
                e,
            ));
        }
    }
    Ok(())
}

struct FileAppender {
    shared: Arc<Shared>,
    last_appended: Option<u64>,
}

impl Appender for FileAppender {
    fn append(&mut self, event_name: &str, value: &[u8]) -> LogResult<u64> {
        let mut state = self.shared.write()?;
        let index = state.next_index();
        let end_offset = state.end_offset;
        let writer = state.writer.as_mut().ok_or_else(LogError::closed)?;

        if !LogRecord::fits_frame(event_name.len(), value.len()) {
            return Err(LogError::append_failed(
                format!("Log record at index {} exceeds the frame limit", index),
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "event name {} bytes, value {} bytes",
                        event_name.len(),
                        value.len()
                    ),
                ),
            ));
        }

        let record = LogRecord::new(index, event_name, value.to_vec());
        let serialized = record.serialize();
        write_record(
            writer,
            &serialized,
            self.shared.config.sync_on_append,
            end_offset,
            index,
        )?;

        state.offsets.push(end_offset);
        state.end_offset = end_offset + serialized.len() as u64;
        self.last_appended = Some(index);

        Ok(index)
    }

    fn last_index_appended(&self) -> Option<u64> {
        self.last_appended
    }
}

struct FileTailer {
    shared: Arc<Shared>,
    file: File,
    next: u64,
}

impl Tailer for FileTailer {
    fn read_next(&mut self) -> LogResult<Option<LogRecord>> {
        let state = self.shared.read()?;
        if state.writer.is_none() {
            return Err(LogError::closed());
        }
        if self.next < state.base_index {
            self.next = state.base_index;
        }
        let offset = match state.offset_of(self.next) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let record = read_record_at(&mut self.file, offset, state.end_offset)?;
        if record.index != self.next {
            return Err(LogError::corruption_at_index(
                record.index,
                format!("Expected index {}", self.next),
            ));
        }
        self.next += 1;
        Ok(Some(record))
    }

    fn move_to_index(&mut self, index: u64) -> LogResult<bool> {
        let state = self.shared.read()?;
        if state.writer.is_none() {
            return Err(LogError::closed());
        }
        if state.offset_of(index).is_none() {
            return Ok(false);
        }
        self.next = index;
        Ok(true)
    }

    fn index(&self) -> u64 {
        self.next
    }

    fn to_start(&mut self) {
        self.next = self.shared.read().map(|s| s.base_index).unwrap_or(0);
    }
}
