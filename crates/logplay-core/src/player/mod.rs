//! Log Playback
//!
//! Replays a log in real time (or scaled) while control requests arrive
//! from any number of threads.
//!
//! ```text
//! producers ──submit──> EventSerializer ──> PlaybackController ──> PlayerTask
//!  (UI, remote,            (one thread)       (play/seek/step)     (one thread
//!   scrubber)                                                       per run)
//! ```

mod clock;
mod controller;
mod events;
mod export;
mod seek;
mod serializer;
mod session;
mod state;
mod task;

pub use clock::{
    Pacing, PlaybackClock, SpeedControl, TimeOrigin, DEFAULT_MAX_WAIT, DEFAULT_SPEED_INDEX,
    SPEEDS,
};
pub use controller::PlaybackController;
pub use events::PlayerEvent;
pub use export::{export_region, ExportSummary};
pub use seek::clamp_ratio;
pub use serializer::{EventHandler, EventSender, EventSerializer};
pub use session::{populate_channel_filters, LogHandle, LogInfo};
pub use state::{ActiveTask, PlaybackState, TaskMode, TaskSlot};

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::feedback::PlaybackObserver;
use crate::filter::ChannelFilterTable;
use crate::log::LogAccessor;
use crate::remote::{RemoteBridge, RemoteControl};
use crate::sink::PublishSink;

/// A complete log player: command thread, shared state and optional
/// remote-control listener.
pub struct LogPlayer {
    serializer: EventSerializer<PlaybackController>,
    remote: Option<RemoteControl>,
    log: Arc<LogHandle>,
    filters: Arc<ChannelFilterTable>,
    speed: Arc<SpeedControl>,
    slot: TaskSlot,
}

impl LogPlayer {
    /// Create a player with no log loaded
    pub fn new(
        config: PlayerConfig,
        sink: Arc<dyn PublishSink>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Result<Self, PlayerError> {
        let filters = Arc::new(config.filter_table()?);
        let controller = PlaybackController::new(
            config.clone(),
            Arc::new(LogHandle::new()),
            filters,
            sink,
            observer,
        );
        Self::start(config, controller)
    }

    /// Create a player around an already opened log, paused at its start
    pub fn with_log(
        config: PlayerConfig,
        accessor: Box<dyn LogAccessor>,
        sink: Arc<dyn PublishSink>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Result<Self, PlayerError> {
        let filters = Arc::new(config.filter_table()?);
        let mut controller = PlaybackController::new(
            config.clone(),
            Arc::new(LogHandle::new()),
            filters,
            sink,
            observer,
        );
        controller.load_log(accessor, false)?;
        Self::start(config, controller)
    }

    fn start(config: PlayerConfig, controller: PlaybackController) -> Result<Self, PlayerError> {
        let log = controller.log();
        let filters = controller.filters();
        let speed = controller.speed();
        let slot = controller.slot();
        let serializer = EventSerializer::spawn(controller)?;

        let remote = if config.remote.enabled {
            let bridge = RemoteBridge::new(
                serializer.sender(),
                Arc::clone(&speed),
                Arc::clone(&log),
                config.step_prefix.clone(),
            );
            match RemoteControl::spawn(config.remote.bind, bridge) {
                Ok(remote) => Some(remote),
                Err(e) => {
                    tracing::warn!(
                        addr = %config.remote.bind,
                        error = %e,
                        "Remote control unavailable"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            serializer,
            remote,
            log,
            filters,
            speed,
            slot,
        })
    }

    /// Queue a control event
    pub fn submit(&self, event: PlayerEvent) {
        self.serializer.submit(event);
    }

    /// Producer handle for other threads
    pub fn sender(&self) -> EventSender {
        self.serializer.sender()
    }

    /// Queue opening another log file
    pub fn open<P: AsRef<Path>>(&self, path: P, autoplay: bool) {
        self.submit(PlayerEvent::OpenLog {
            path: path.as_ref().to_path_buf(),
            autoplay,
        });
    }

    /// Shared speed selection
    pub fn speed(&self) -> &SpeedControl {
        &self.speed
    }

    /// Channel filters of the loaded log
    pub fn filters(&self) -> &ChannelFilterTable {
        &self.filters
    }

    /// The loaded log
    pub fn log(&self) -> &LogHandle {
        &self.log
    }

    /// True while a player task is running
    pub fn is_playing(&self) -> bool {
        self.slot.is_playing()
    }

    /// Address the remote-control listener is bound to
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote.as_ref().map(RemoteControl::local_addr)
    }

    /// Process everything queued, stop playback, save preferences and shut
    /// down all threads.
    pub fn close(mut self) -> Result<(), PlayerError> {
        if let Some(remote) = self.remote.take() {
            remote.shutdown();
        }
        match self.serializer.shutdown() {
            Some(mut controller) => controller.close_log(),
            None => Ok(()),
        }
    }
}
