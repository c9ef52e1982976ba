//! Event Logs
//!
//! Sequential, fraction-seekable access to logs of timestamped,
//! channel-tagged records.

mod error;
mod file;
mod memory;

pub use error::LogError;
pub use file::{LogFile, LogFileWriter, LOG_MAGIC, MAX_CHANNEL_LEN, MAX_PAYLOAD_LEN};
pub use memory::MemoryLog;

use std::path::Path;

/// One timestamped record read from a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Sequence number assigned when the record was logged
    pub event_number: i64,
    /// Capture time in microseconds
    pub timestamp: i64,
    /// Channel the record was captured on
    pub channel: String,
    /// Opaque payload bytes
    pub payload: Vec<u8>,
}

impl Record {
    /// Create a new record
    pub fn new(
        event_number: i64,
        timestamp: i64,
        channel: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            event_number,
            timestamp,
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// A cursor over a log that can be repositioned by fraction of its length.
///
/// Implementations are driven from one thread at a time; callers share them
/// behind a mutex.
pub trait LogAccessor: Send {
    /// Read the record at the cursor and advance past it.
    ///
    /// Returns [`LogError::EndOfStream`] once the log is exhausted.
    fn read_next(&mut self) -> Result<Record, LogError>;

    /// Move the cursor to `fraction` (0.0..=1.0) of the log
    fn seek_fraction(&mut self, fraction: f64) -> Result<(), LogError>;

    /// Current cursor position as a fraction of the log
    fn position_fraction(&mut self) -> Result<f64, LogError>;

    /// Open a second, independent cursor on the same log
    fn reopen(&self) -> Result<Box<dyn LogAccessor>, LogError>;

    /// Backing file, if any
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Destination for records (export target)
pub trait RecordWriter: Send {
    /// Append a record
    fn write_record(&mut self, record: &Record) -> Result<(), LogError>;

    /// Flush any buffered output
    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}

impl RecordWriter for Vec<Record> {
    fn write_record(&mut self, record: &Record) -> Result<(), LogError> {
        self.push(record.clone());
        Ok(())
    }
}
