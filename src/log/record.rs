//! Log record layout
//!
//! Each record on disk is:
//! - Record Length (u32 LE), the full size including this field
//! - Index (u64 LE)
//! - Event Name Length (u32 LE) + Event Name (UTF-8)
//! - Value Length (u32 LE) + Value bytes
//! - Checksum (u32 LE) over every preceding byte
//!
//! The event name carries the topic; the value carries the encoded message.

use std::io::{self, Cursor, Read};

use super::checksum::{compute_checksum, verify_checksum};

/// Fixed bytes in every record: length + index + two length prefixes + checksum
pub const RECORD_OVERHEAD: usize = 4 + 8 + 4 + 4 + 4;

/// Largest encoded record; the length prefix is a u32
pub const MAX_RECORD_LEN: u64 = u32::MAX as u64;

/// One immutable entry of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Position assigned by the log, strictly increasing
    pub index: u64,
    /// Event name (the topic as text)
    pub event_name: String,
    /// Event value (the encoded message)
    pub value: Vec<u8>,
}

impl LogRecord {
    /// Create a new record
    pub fn new(index: u64, event_name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            index,
            event_name: event_name.into(),
            value,
        }
    }

    /// Whether a record with these field sizes fits the u32 length prefix.
    pub fn fits_frame(event_name_len: usize, value_len: usize) -> bool {
        (RECORD_OVERHEAD as u64)
            .checked_add(event_name_len as u64)
            .and_then(|n| n.checked_add(value_len as u64))
            .map_or(false, |total| total <= MAX_RECORD_LEN)
    }

    /// Size of the serialized record in bytes
    pub fn encoded_len(&self) -> usize {
        RECORD_OVERHEAD + self.event_name.len() + self.value.len()
    }

    /// Serialize with length prefix and trailing checksum
    pub fn serialize(&self) -> Vec<u8> {
        let total = self.encoded_len();
        let mut buf = Vec::with_capacity(total);

        buf.extend_from_slice(&(total as u32).to_le_bytes());
        buf.extend_from_slice(&self.index.to_le_bytes());
        buf.extend_from_slice(&(self.event_name.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.event_name.as_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.value);

        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());

        buf
    }

    /// Deserialize one record from the front of `data`.
    ///
    /// Returns the record and the number of bytes consumed. Checksum and
    /// framing failures are reported as `InvalidData`.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < RECORD_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "record shorter than fixed overhead",
            ));
        }

        let total = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if total < RECORD_OVERHEAD || total > data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid record length {}", total),
            ));
        }

        let body_end = total - 4;
        let stored = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        if !verify_checksum(&data[..body_end], stored) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "checksum mismatch",
            ));
        }

        let mut cursor = Cursor::new(&data[4..body_end]);

        let mut index_buf = [0u8; 8];
        cursor.read_exact(&mut index_buf)?;
        let index = u64::from_le_bytes(index_buf);

        let mut len_buf = [0u8; 4];
        cursor.read_exact(&mut len_buf)?;
        let name_len = u32::from_le_bytes(len_buf) as usize;
        let mut name_buf = vec![0u8; name_len];
        cursor.read_exact(&mut name_buf)?;
        let event_name = String::from_utf8(name_buf).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
        })?;

        cursor.read_exact(&mut len_buf)?;
        let value_len = u32::from_le_bytes(len_buf) as usize;
        let mut value = vec![0u8; value_len];
        cursor.read_exact(&mut value)?;

        if cursor.position() as usize != body_end - 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "record length does not match its fields",
            ));
        }

        Ok((
            Self {
                index,
                event_name,
                value,
            },
            total,
        ))
    }
}
