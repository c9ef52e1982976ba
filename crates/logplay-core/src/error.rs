//! Player errors

use thiserror::Error;

use crate::config::ConfigError;
use crate::log::LogError;
use crate::prefs::PreferencesError;

/// Errors returned by playback control operations
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Reading or writing the log failed
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// Preferences file could not be read or written
    #[error(transparent)]
    Preferences(#[from] PreferencesError),

    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker thread could not be started
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        /// Which thread
        name: &'static str,
        /// OS error
        source: std::io::Error,
    },

    /// The operation needs a loaded log
    #[error("No log loaded")]
    NoLog,

    /// I/O failure outside the log
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
