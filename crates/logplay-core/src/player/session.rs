//! Loaded log session
//!
//! Holds the log currently being played together with facts probed when it
//! was opened, and the open/close sequence: preferences of the previous log
//! are saved, the new log is probed, its preferences loaded and its
//! channels discovered.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use super::controller::PlaybackController;
use crate::error::PlayerError;
use crate::filter::ChannelFilterTable;
use crate::log::{LogAccessor, LogError, LogFile, Record};
use crate::prefs::Preferences;
use crate::sync;

/// Facts about the loaded log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogInfo {
    /// Backing file, if the log came from disk
    pub path: Option<PathBuf>,
    /// Timestamp of the first record (us)
    pub time_offset: i64,
    /// Estimated duration in seconds, if it could be measured
    pub total_seconds: Option<f64>,
}

impl LogInfo {
    /// Probe the start time and estimate the duration of a log.
    ///
    /// The duration is extrapolated from the records found at 10% and 90%
    /// of the log. The cursor is left at the start.
    pub fn probe(log: &mut dyn LogAccessor) -> Result<Self, LogError> {
        let mut info = LogInfo {
            path: log.path().map(Path::to_path_buf),
            ..LogInfo::default()
        };

        log.seek_fraction(0.0)?;
        match log.read_next() {
            Ok(first) => info.time_offset = first.timestamp,
            Err(LogError::EndOfStream) => return Ok(info),
            Err(e) => return Err(e),
        }

        info.total_seconds = estimate_duration(log).ok().filter(|s| *s > 0.0);
        tracing::debug!(?info.total_seconds, "Estimated log duration");

        log.seek_fraction(0.0)?;
        Ok(info)
    }
}

fn estimate_duration(log: &mut dyn LogAccessor) -> Result<f64, LogError> {
    log.seek_fraction(0.10)?;
    let early = log.read_next()?;
    log.seek_fraction(0.90)?;
    let late = log.read_next()?;
    Ok((late.timestamp - early.timestamp) as f64 / 1_000_000.0 / 0.8)
}

/// The log currently loaded into the player, shared between the command
/// thread, the active player task and the remote-control listener.
#[derive(Default)]
pub struct LogHandle {
    accessor: Mutex<Option<Box<dyn LogAccessor>>>,
    /// Record read by a task that was stopped before publishing it, with
    /// the position fraction after it
    pending: Mutex<Option<(Record, f64)>>,
    info: RwLock<LogInfo>,
}

impl LogHandle {
    /// Handle with no log loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle with a log already loaded
    pub fn with_log(accessor: Box<dyn LogAccessor>, info: LogInfo) -> Self {
        Self {
            accessor: Mutex::new(Some(accessor)),
            pending: Mutex::new(None),
            info: RwLock::new(info),
        }
    }

    /// True if a log is loaded
    pub fn is_loaded(&self) -> bool {
        sync::lock(&self.accessor).is_some()
    }

    /// Facts probed when the log was opened
    pub fn info(&self) -> LogInfo {
        sync::read(&self.info).clone()
    }

    /// Run `f` against the loaded log while holding its lock
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut dyn LogAccessor) -> Result<R, LogError>,
    ) -> Result<R, PlayerError> {
        let mut accessor = sync::lock(&self.accessor);
        let log = accessor.as_deref_mut().ok_or(PlayerError::NoLog)?;
        Ok(f(log)?)
    }

    /// Cursor position of the loaded log
    pub fn position_fraction(&self) -> Result<f64, PlayerError> {
        self.with(|log| log.position_fraction())
    }

    /// Hand back a record that was read but not published. The next
    /// [`take_pending`](Self::take_pending) returns it.
    pub(crate) fn unread(&self, record: Record, fraction: f64) {
        *sync::lock(&self.pending) = Some((record, fraction));
    }

    pub(crate) fn take_pending(&self) -> Option<(Record, f64)> {
        sync::lock(&self.pending).take()
    }

    pub(crate) fn replace(&self, accessor: Option<Box<dyn LogAccessor>>, info: LogInfo) {
        *sync::lock(&self.pending) = None;
        *sync::lock(&self.accessor) = accessor;
        *sync::write(&self.info) = info;
    }
}

/// Register a filter for every channel seen in the first `scan_seconds` of
/// the log, then rewind to the start.
pub fn populate_channel_filters(
    log: &mut dyn LogAccessor,
    filters: &ChannelFilterTable,
    scan_seconds: f64,
) -> Result<usize, LogError> {
    let limit = (scan_seconds * 1_000_000.0) as i64;
    let mut start = None;
    let mut scanned = 0;

    loop {
        let record = match log.read_next() {
            Ok(record) => record,
            Err(LogError::EndOfStream) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Channel scan stopped early");
                break;
            }
        };
        let first = *start.get_or_insert(record.timestamp);
        if record.timestamp - first > limit {
            break;
        }
        filters.lookup(&record.channel);
        scanned += 1;
    }

    log.seek_fraction(0.0)?;
    Ok(scanned)
}

impl PlaybackController {
    /// Replace the current log with the file at `path`.
    ///
    /// Preferences of the previous log are saved before it is unloaded. If `autoplay` is
    /// false the beginning of the log is scanned for channels instead.
    pub fn open_log(&mut self, path: &Path, autoplay: bool) -> Result<(), PlayerError> {
        let accessor = LogFile::open(path)?;
        self.load_log(Box::new(accessor), autoplay)
    }

    /// Replace the current log with an already opened accessor.
    ///
    /// The new log is probed and its preferences read before the current
    /// log is touched; if either fails the current log stays loaded.
    pub fn load_log(
        &mut self,
        mut accessor: Box<dyn LogAccessor>,
        autoplay: bool,
    ) -> Result<(), PlayerError> {
        let info = LogInfo::probe(accessor.as_mut())?;
        let preferences = match &info.path {
            Some(path) => Preferences::load(Preferences::path_for(path))?,
            None => Preferences::default(),
        };

        self.stop();
        if self.ctx.log.is_loaded() {
            if let Err(e) = self.save_preferences() {
                tracing::warn!(error = %e, "Previous log's preferences not saved");
            }
        }

        tracing::info!(
            path = ?info.path,
            total_seconds = ?info.total_seconds,
            "Opened log"
        );
        self.ctx.filters.reset(&preferences.channels);
        self.preferences = preferences;
        self.ctx.log.replace(Some(accessor), info);

        if autoplay {
            self.play()?;
        } else {
            let scan_seconds = self.config.scan_seconds;
            let filters = &self.ctx.filters;
            let found = self
                .ctx
                .log
                .with(|log| populate_channel_filters(log, filters, scan_seconds))?;
            tracing::debug!(records = found, channels = filters.len(), "Scanned channels");
        }
        Ok(())
    }

    /// Write the current log's preferences file, if it came from disk
    pub fn save_preferences(&self) -> Result<(), PlayerError> {
        if let Some(path) = self.ctx.log.info().path {
            let prefs_path = Preferences::path_for(&path);
            self.ctx.filters.save(&prefs_path, &self.preferences)?;
            tracing::debug!(path = %prefs_path.display(), "Saved preferences");
        }
        Ok(())
    }

    /// Stop playback, save preferences and unload the current log
    pub fn close_log(&mut self) -> Result<(), PlayerError> {
        self.stop();
        if !self.ctx.log.is_loaded() {
            return Ok(());
        }
        let saved = self.save_preferences();
        self.ctx.log.replace(None, LogInfo::default());
        self.preferences = Preferences::default();
        saved
    }
}
