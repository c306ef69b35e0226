//! Log error types
//!
//! Error codes:
//! - LOG_APPEND_FAILED (ERROR severity)
//! - LOG_READ_FAILED (ERROR severity)
//! - LOG_SEEK_TIMEOUT (ERROR severity)
//! - LOG_CLOSED (ERROR severity)
//! - LOG_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for log errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the log stays usable
    Error,
    /// The log must not be used again
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Log-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogErrorCode {
    /// Record could not be written
    LogAppendFailed,
    /// Record could not be read
    LogReadFailed,
    /// Positioning a cursor timed out
    LogSeekTimeout,
    /// The log has been closed
    LogClosed,
    /// Checksum, framing or index continuity failure
    LogCorruption,
}

impl LogErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            LogErrorCode::LogAppendFailed => "LOG_APPEND_FAILED",
            LogErrorCode::LogReadFailed => "LOG_READ_FAILED",
            LogErrorCode::LogSeekTimeout => "LOG_SEEK_TIMEOUT",
            LogErrorCode::LogClosed => "LOG_CLOSED",
            LogErrorCode::LogCorruption => "LOG_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            LogErrorCode::LogCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for LogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Log error type with code, message and optional context
#[derive(Debug)]
pub struct LogError {
    code: LogErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl LogError {
    fn new(code: LogErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create an append failed error
    pub fn append_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(LogErrorCode::LogAppendFailed, message)
        }
    }

    /// Create a read failed error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(LogErrorCode::LogReadFailed, message)
        }
    }

    /// Create a seek timeout error for the requested index
    pub fn seek_timeout(index: u64) -> Self {
        Self {
            details: Some(format!("index: {}", index)),
            ..Self::new(LogErrorCode::LogSeekTimeout, "timed out moving cursor")
        }
    }

    /// Create a closed error
    pub fn closed() -> Self {
        Self::new(LogErrorCode::LogClosed, "log is closed")
    }

    /// Create a corruption error
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::new(LogErrorCode::LogCorruption, message)
    }

    /// Create a corruption error with index context
    pub fn corruption_at_index(index: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("index: {}", index)),
            ..Self::new(LogErrorCode::LogCorruption, reason)
        }
    }

    /// Create a corruption error with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::new(LogErrorCode::LogCorruption, reason)
        }
    }

    /// Returns the error code
    pub fn code(&self) -> LogErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether the log must not be used after this error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns whether this is a seek timeout
    pub fn is_seek_timeout(&self) -> bool {
        self.code == LogErrorCode::LogSeekTimeout
    }

    /// Returns whether the log was closed
    pub fn is_closed(&self) -> bool {
        self.code == LogErrorCode::LogClosed
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for log operations
pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LogErrorCode::LogAppendFailed.code(), "LOG_APPEND_FAILED");
        assert_eq!(LogErrorCode::LogSeekTimeout.code(), "LOG_SEEK_TIMEOUT");
        assert_eq!(LogErrorCode::LogCorruption.code(), "LOG_CORRUPTION");
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(LogError::corruption("bad crc").is_fatal());
        assert!(!LogError::seek_timeout(3).is_fatal());
        assert!(!LogError::closed().is_fatal());
        assert!(!LogError::append_failed("disk full", io::Error::new(io::ErrorKind::Other, "full")).is_fatal());
    }

    #[test]
    fn test_display_contains_context() {
        let err = LogError::corruption_at_index(42, "checksum mismatch");
        let display = err.to_string();
        assert!(display.contains("LOG_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("checksum mismatch"));
        assert!(display.contains("index: 42"));
    }

    #[test]
    fn test_seek_timeout_is_distinguishable() {
        let err = LogError::seek_timeout(7);
        assert!(err.is_seek_timeout());
        assert!(!err.is_closed());
        assert_eq!(err.details(), Some("index: 7"));
    }
}
