//! In-memory event log

use std::sync::Arc;

use super::{LogAccessor, LogError, Record};

/// A log held entirely in memory.
///
/// Fractions map onto record indices: `seek_fraction(f)` places the cursor
/// at record `floor(len * f)`.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    records: Arc<[Record]>,
    cursor: usize,
}

impl MemoryLog {
    /// Create a log over the given records
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
            cursor: 0,
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the next record to be read
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl LogAccessor for MemoryLog {
    fn read_next(&mut self) -> Result<Record, LogError> {
        let record = self
            .records
            .get(self.cursor)
            .cloned()
            .ok_or(LogError::EndOfStream)?;
        self.cursor += 1;
        Ok(record)
    }

    fn seek_fraction(&mut self, fraction: f64) -> Result<(), LogError> {
        let index = (self.records.len() as f64 * fraction.clamp(0.0, 1.0)) as usize;
        self.cursor = index.min(self.records.len());
        Ok(())
    }

    fn position_fraction(&mut self) -> Result<f64, LogError> {
        if self.records.is_empty() {
            return Ok(0.0);
        }
        Ok(self.cursor as f64 / self.records.len() as f64)
    }

    fn reopen(&self) -> Result<Box<dyn LogAccessor>, LogError> {
        Ok(Box::new(MemoryLog {
            records: Arc::clone(&self.records),
            cursor: 0,
        }))
    }
}
