//! Player control events
//!
//! Every control request (buttons, the remote-control socket, scrubber
//! callbacks) becomes one of these and is queued for the command thread.

use std::path::PathBuf;

/// A queued control command
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Pause if playing, play if paused
    PlayPauseToggle,
    /// Play (`true`) or pause (`false`)
    PlayPauseSet(bool),
    /// Move to a fraction of the log, keeping the play/pause state
    Seek(f64),
    /// Play until a record on a channel with this prefix has been published
    Step(String),
    /// Copy the enabled records between two fractions of the log to a file
    ExportRegion {
        /// Start fraction
        start: f64,
        /// End fraction, exclusive
        end: f64,
        /// Log file to create
        destination: PathBuf,
    },
    /// Switch to another log file
    OpenLog { path: PathBuf, autoplay: bool },
}
