//! Log access errors

use thiserror::Error;

/// Errors that can occur while reading or writing an event log
#[derive(Error, Debug)]
pub enum LogError {
    /// No more records can be read from the current position
    #[error("End of log reached")]
    EndOfStream,

    /// A record that cannot be written in the log format
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// True for the end-of-stream sentinel
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, LogError::EndOfStream)
    }
}
