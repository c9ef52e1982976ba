//! Region export
//!
//! Copies the records between two positions of the log to another log,
//! honouring the channel enable flags. Export reads through its own cursor
//! so playback position is unaffected.

use std::path::Path;

use super::controller::PlaybackController;
use crate::error::PlayerError;
use crate::filter::ChannelFilterTable;
use crate::log::{LogAccessor, LogError, LogFileWriter, RecordWriter};

/// Result of an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Records read from the source
    pub read: usize,
    /// Records written to the destination
    pub written: usize,
}

/// Copy records read while the cursor is before `end`, starting at
/// `start`. Only channels with an existing, enabled filter are written,
/// under their original channel name.
pub fn export_region(
    source: &mut dyn LogAccessor,
    dest: &mut dyn RecordWriter,
    filters: &ChannelFilterTable,
    start: f64,
    end: f64,
) -> Result<ExportSummary, LogError> {
    let mut summary = ExportSummary::default();
    source.seek_fraction(start)?;

    while source.position_fraction()? < end {
        let record = match source.read_next() {
            Ok(record) => record,
            Err(LogError::EndOfStream) => break,
            Err(e) => return Err(e),
        };
        summary.read += 1;

        if filters.get(&record.channel).is_some_and(|f| f.enabled) {
            dest.write_record(&record)?;
            summary.written += 1;
        }
    }

    dest.flush()?;
    Ok(summary)
}

impl PlaybackController {
    /// Export `[start, end)` of the current log to a new log file
    pub fn export(
        &mut self,
        start: f64,
        end: f64,
        destination: &Path,
    ) -> Result<ExportSummary, PlayerError> {
        let mut dest = LogFileWriter::create(destination)?;
        self.export_to(start, end, &mut dest)
    }

    /// Export `[start, end)` of the current log to any record writer
    pub fn export_to(
        &mut self,
        start: f64,
        end: f64,
        dest: &mut dyn RecordWriter,
    ) -> Result<ExportSummary, PlayerError> {
        let mut source = self.ctx.log.with(|log| log.reopen())?;
        let summary = export_region(source.as_mut(), dest, &self.ctx.filters, start, end)?;
        tracing::info!(start, end, read = summary.read, written = summary.written, "Export complete");
        Ok(summary)
    }
}
