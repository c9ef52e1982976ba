//! Playback controller
//!
//! Play, pause and step operations. All of these are meant to be driven by
//! the event serializer; only that thread may start or stop player tasks.

use std::sync::Arc;

use super::clock::SpeedControl;
use super::events::PlayerEvent;
use super::serializer::EventHandler;
use super::session::LogHandle;
use super::state::{TaskMode, TaskSlot};
use super::task::{PlayerTask, TaskContext};
use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::feedback::PlaybackObserver;
use crate::filter::ChannelFilterTable;
use crate::prefs::Preferences;
use crate::sink::PublishSink;

/// Executes control events against the loaded log
pub struct PlaybackController {
    pub(crate) ctx: TaskContext,
    pub(crate) config: PlayerConfig,
    /// Bookmarks and zoom of the current log, carried through to the next
    /// preferences save
    pub(crate) preferences: Preferences,
}

impl PlaybackController {
    /// Controller over shared state; nothing is loaded until `load_log`
    pub fn new(
        config: PlayerConfig,
        log: Arc<LogHandle>,
        filters: Arc<ChannelFilterTable>,
        sink: Arc<dyn PublishSink>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Self {
        let ctx = TaskContext {
            log,
            filters,
            sink,
            observer,
            speed: Arc::new(SpeedControl::new(config.initial_speed_index)),
            slot: TaskSlot::new(),
            max_wait: config.max_wait(),
            display_interval: config.display_interval(),
        };
        Self {
            ctx,
            config,
            preferences: Preferences::default(),
        }
    }

    /// Shared speed selection
    pub fn speed(&self) -> Arc<SpeedControl> {
        Arc::clone(&self.ctx.speed)
    }

    /// Handle to the task slot
    pub fn slot(&self) -> TaskSlot {
        self.ctx.slot.clone()
    }

    /// The loaded log
    pub fn log(&self) -> Arc<LogHandle> {
        Arc::clone(&self.ctx.log)
    }

    /// Channel filters of the loaded log
    pub fn filters(&self) -> Arc<ChannelFilterTable> {
        Arc::clone(&self.ctx.filters)
    }

    /// Bookmarks and zoom of the loaded log
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// True while a player task is running
    pub fn is_playing(&self) -> bool {
        self.ctx.slot.is_playing()
    }

    /// Start continuous playback. Returns false if already playing.
    pub fn play(&mut self) -> Result<bool, PlayerError> {
        self.launch(TaskMode::Continuous)
    }

    /// Play until a record on a channel starting with `prefix` has been
    /// handled. Returns false if already playing.
    pub fn step(&mut self, prefix: &str) -> Result<bool, PlayerError> {
        self.launch(TaskMode::Step(prefix.to_string()))
    }

    /// Stop playback and wait for the player task to exit. Returns false if
    /// nothing was playing.
    pub fn stop(&mut self) -> bool {
        self.ctx.slot.stop()
    }

    /// Pause if playing, play otherwise
    pub fn toggle(&mut self) -> Result<(), PlayerError> {
        if self.is_playing() {
            self.stop();
        } else {
            self.play()?;
        }
        Ok(())
    }

    /// Play or pause
    pub fn set_playing(&mut self, playing: bool) -> Result<(), PlayerError> {
        if playing {
            self.play()?;
        } else {
            self.stop();
        }
        Ok(())
    }

    fn launch(&mut self, mode: TaskMode) -> Result<bool, PlayerError> {
        if !self.ctx.log.is_loaded() {
            return Err(PlayerError::NoLog);
        }
        let ctx = self.ctx.clone();
        self.ctx.slot.launch(mode.clone(), move |id, stop| {
            PlayerTask::new(id, mode, ctx, stop).spawn()
        })
    }
}

impl EventHandler for PlaybackController {
    fn handle(&mut self, event: PlayerEvent) -> Result<(), PlayerError> {
        match event {
            PlayerEvent::PlayPauseToggle => self.toggle(),
            PlayerEvent::PlayPauseSet(playing) => self.set_playing(playing),
            PlayerEvent::Seek(ratio) => self.seek(ratio),
            PlayerEvent::Step(prefix) => self.step(&prefix).map(|_| ()),
            PlayerEvent::ExportRegion {
                start,
                end,
                destination,
            } => self.export(start, end, &destination).map(|_| ()),
            PlayerEvent::OpenLog { path, autoplay } => self.open_log(&path, autoplay),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}
