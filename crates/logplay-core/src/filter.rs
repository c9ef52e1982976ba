//! Channel Filters
//!
//! Per-channel rename/enable state applied before a record is republished.
//!
//! Filters are created lazily the first time a channel is seen during
//! playback, or restored from the preferences file that sits next to a log.
//! Mutation happens from the command thread or the active playback task,
//! never both at once; readers get a consistent snapshot per call.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::prefs::{Preferences, PreferencesError};
use crate::sync;

/// Output mapping for one input channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFilter {
    /// Channel name as recorded in the log
    pub inchannel: String,
    /// Channel name records are republished on
    pub outchannel: String,
    /// Whether records on this channel are republished at all
    pub enabled: bool,
}

impl ChannelFilter {
    /// Pass-through filter: same name in and out, enabled
    pub fn new(inchannel: impl Into<String>) -> Self {
        let inchannel = inchannel.into();
        Self {
            outchannel: inchannel.clone(),
            inchannel,
            enabled: true,
        }
    }

    /// True if a record on this channel should be published
    pub fn publishes(&self) -> bool {
        self.enabled && !self.outchannel.is_empty()
    }
}

/// Regex deciding which channels start out enabled.
///
/// Without inversion, channels matching the pattern are disabled; with
/// inversion only matching channels stay enabled.
#[derive(Debug, Clone)]
pub struct ChannelSelection {
    pattern: Regex,
    invert: bool,
}

impl ChannelSelection {
    /// Compile a selection. The pattern must match the whole channel name.
    pub fn new(pattern: &str, invert: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{})$", pattern))?,
            invert,
        })
    }

    /// Whether `channel` is allowed to be enabled
    pub fn allows(&self, channel: &str) -> bool {
        !(self.invert ^ self.pattern.is_match(channel))
    }
}

/// The set of channel filters for the currently loaded log
#[derive(Debug, Default)]
pub struct ChannelFilterTable {
    filters: RwLock<BTreeMap<String, ChannelFilter>>,
    selection: Option<ChannelSelection>,
    changed: AtomicBool,
}

impl ChannelFilterTable {
    /// Create an empty table where every new channel starts enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table whose new channels are gated by `selection`
    pub fn with_selection(selection: ChannelSelection) -> Self {
        Self {
            selection: Some(selection),
            ..Self::default()
        }
    }

    fn default_enabled(&self, channel: &str) -> bool {
        self.selection
            .as_ref()
            .map_or(true, |s| s.allows(channel))
    }

    /// Get the filter for `inchannel`, registering a pass-through filter if
    /// the channel has not been seen before.
    pub fn lookup(&self, inchannel: &str) -> ChannelFilter {
        if let Some(filter) = sync::read(&self.filters).get(inchannel) {
            return filter.clone();
        }

        let mut filters = sync::write(&self.filters);
        filters
            .entry(inchannel.to_string())
            .or_insert_with(|| {
                let mut filter = ChannelFilter::new(inchannel);
                filter.enabled = self.default_enabled(inchannel);
                tracing::debug!(channel = inchannel, enabled = filter.enabled, "New channel");
                self.changed.store(true, Ordering::Release);
                filter
            })
            .clone()
    }

    /// Get an existing filter without registering one
    pub fn get(&self, inchannel: &str) -> Option<ChannelFilter> {
        sync::read(&self.filters).get(inchannel).cloned()
    }

    /// Change the output channel. Returns false if the channel is unknown.
    pub fn rename(&self, inchannel: &str, outchannel: impl Into<String>) -> bool {
        self.modify(inchannel, |f| f.outchannel = outchannel.into())
    }

    /// Enable or disable a channel. Returns false if the channel is unknown.
    pub fn set_enabled(&self, inchannel: &str, enabled: bool) -> bool {
        self.modify(inchannel, |f| f.enabled = enabled)
    }

    /// Flip the enabled flag of every listed channel that exists
    pub fn toggle_enabled<I, S>(&self, inchannels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters = sync::write(&self.filters);
        for name in inchannels {
            if let Some(filter) = filters.get_mut(name.as_ref()) {
                filter.enabled = !filter.enabled;
            }
        }
        self.changed.store(true, Ordering::Release);
    }

    fn modify(&self, inchannel: &str, f: impl FnOnce(&mut ChannelFilter)) -> bool {
        let mut filters = sync::write(&self.filters);
        match filters.get_mut(inchannel) {
            Some(filter) => {
                f(filter);
                self.changed.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Insert or overwrite a filter restored from preferences. The channel
    /// selection can only narrow the saved enabled flag.
    pub fn restore(&self, mut filter: ChannelFilter) {
        filter.enabled = filter.enabled && self.default_enabled(&filter.inchannel);
        sync::write(&self.filters).insert(filter.inchannel.clone(), filter);
        self.changed.store(true, Ordering::Release);
    }

    /// All filters ordered by input channel
    pub fn snapshot(&self) -> Vec<ChannelFilter> {
        sync::read(&self.filters).values().cloned().collect()
    }

    /// Number of known channels
    pub fn len(&self) -> usize {
        sync::read(&self.filters).len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        sync::read(&self.filters).is_empty()
    }

    /// Forget every filter (a new log is being loaded)
    pub fn clear(&self) {
        sync::write(&self.filters).clear();
        self.changed.store(true, Ordering::Release);
    }

    /// Returns true once after any change, for display refresh
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    /// Replace the table with the `CHANNEL` lines of a preferences file.
    ///
    /// A missing file clears the table and yields empty preferences.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Preferences, PreferencesError> {
        let prefs = Preferences::load(path)?;
        self.reset(&prefs.channels);
        Ok(prefs)
    }

    /// Replace the whole table with `filters`
    pub fn reset(&self, filters: &[ChannelFilter]) {
        self.clear();
        for filter in filters {
            self.restore(filter.clone());
        }
    }

    /// Write the table, plus the non-channel entries of `extras`, to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P, extras: &Preferences) -> Result<(), PreferencesError> {
        let prefs = Preferences {
            channels: self.snapshot(),
            ..extras.clone()
        };
        prefs.save(path)
    }
}
