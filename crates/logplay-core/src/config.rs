//! Player configuration
//!
//! Loaded from JSON; every field has a default so a partial file (or no
//! file at all) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::filter::{ChannelFilterTable, ChannelSelection};
use crate::player::DEFAULT_SPEED_INDEX;

/// UDP port the remote-control listener binds on loopback
pub const DEFAULT_REMOTE_PORT: u16 = 53261;

/// Errors loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// File involved
        path: PathBuf,
        /// OS error
        source: io::Error,
    },

    /// Config file is not valid JSON for this schema
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Parser error
        source: serde_json::Error,
    },

    /// `channel_filter` is not a valid regex
    #[error("Invalid channel filter pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Remote-control listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Start the listener
    pub enabled: bool,
    /// Address to bind; loopback by default
    pub bind: SocketAddr,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_REMOTE_PORT)),
        }
    }
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Longest single wait before a gap counts as a hole in the log
    pub max_wait_ms: u64,
    /// Minimum interval between position updates
    pub display_interval_ms: u64,
    /// Starting index into the speed table
    pub initial_speed_index: usize,
    /// Channel prefix used by remote `STEP` commands
    pub step_prefix: String,
    /// Seconds of log scanned to pre-populate channel filters when a log
    /// is opened paused
    pub scan_seconds: f64,
    /// Channels matching this regex start disabled
    pub channel_filter: Option<String>,
    /// Invert `channel_filter`: only matching channels start enabled
    pub invert_channel_filter: bool,
    /// Remote-control listener
    pub remote: RemoteConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: 250,
            display_interval_ms: 100,
            initial_speed_index: DEFAULT_SPEED_INDEX,
            step_prefix: String::new(),
            scan_seconds: 30.0,
            channel_filter: None,
            invert_channel_filter: false,
            remote: RemoteConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the per-user config if it exists, defaults otherwise
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/logplay/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("logplay").join("config.json"))
    }

    /// `max_wait_ms` as a duration
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// `display_interval_ms` as a duration
    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    /// Build the channel filter table described by this config
    pub fn filter_table(&self) -> Result<ChannelFilterTable, ConfigError> {
        match &self.channel_filter {
            Some(pattern) => Ok(ChannelFilterTable::with_selection(ChannelSelection::new(
                pattern,
                self.invert_channel_filter,
            )?)),
            None => Ok(ChannelFilterTable::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.max_wait(), Duration::from_millis(250));
        assert_eq!(config.display_interval(), Duration::from_millis(100));
        assert_eq!(config.remote.bind.port(), DEFAULT_REMOTE_PORT);
        assert!(config.remote.bind.ip().is_loopback());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{"max_wait_ms": 500, "remote": {{"enabled": false}}}}"#).unwrap();

        let config = PlayerConfig::load(tmp.path()).unwrap();
        assert_eq!(config.max_wait_ms, 500);
        assert!(!config.remote.enabled);
        assert_eq!(config.remote.bind.port(), DEFAULT_REMOTE_PORT);
        assert_eq!(config.display_interval_ms, 100);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "not json").unwrap();
        assert!(matches!(
            PlayerConfig::load(tmp.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let config = PlayerConfig {
            channel_filter: Some("(".into()),
            ..PlayerConfig::default()
        };
        assert!(matches!(config.filter_table(), Err(ConfigError::Pattern(_))));
    }
}
