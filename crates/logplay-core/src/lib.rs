//! # logplay Core Library
//!
//! Real-time playback of event logs.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Sequential and fraction-seekable access to event log files
//! - A playback clock that paces records against wall-clock time at a
//!   selectable speed, with hole detection
//! - A single-threaded command serializer so play/pause/seek/step requests
//!   from many threads execute in a strict order
//! - Per-channel rename/enable filters persisted next to each log
//! - A loopback UDP remote control
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use logplay_core::prelude::*;
//!
//! let player = LogPlayer::new(PlayerConfig::default(), Arc::new(TracingSink), Arc::new(NullObserver))?;
//! player.open("run1.log", true);
//! player.submit(PlayerEvent::Seek(0.5));
//! player.close()?;
//! ```

pub mod config;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod log;
pub mod player;
pub mod prefs;
pub mod remote;
pub mod sink;
mod sync;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::PlayerConfig;
    pub use crate::error::PlayerError;
    pub use crate::feedback::{NullObserver, PlaybackObserver, PositionUpdate, TracingObserver};
    pub use crate::filter::{ChannelFilter, ChannelFilterTable};
    pub use crate::log::{LogAccessor, LogError, LogFile, MemoryLog, Record};
    pub use crate::player::{LogPlayer, PlayerEvent, SpeedControl};
    pub use crate::sink::{PublishSink, TracingSink};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
