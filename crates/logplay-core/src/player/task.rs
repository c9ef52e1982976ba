//! Player task
//!
//! One replay run on its own thread. A task reads records from the shared
//! log, paces them with a [`PlaybackClock`], republishes them through the
//! channel filters and reports progress. Tasks are single use: stopping is
//! final and a new run always gets a new task.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::clock::{PlaybackClock, SpeedControl};
use super::session::LogHandle;
use super::state::{StopSignal, TaskMode, TaskSlot};
use crate::error::PlayerError;
use crate::feedback::{PlaybackObserver, PositionUpdate, SpeedMeter, Throttle};
use crate::filter::ChannelFilterTable;
use crate::log::{LogError, Record};
use crate::sink::PublishSink;

/// Everything a player task needs, shared with the controller
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub(crate) log: Arc<LogHandle>,
    pub(crate) filters: Arc<ChannelFilterTable>,
    pub(crate) sink: Arc<dyn PublishSink>,
    pub(crate) observer: Arc<dyn PlaybackObserver>,
    pub(crate) speed: Arc<SpeedControl>,
    pub(crate) slot: TaskSlot,
    pub(crate) max_wait: Duration,
    pub(crate) display_interval: Duration,
}

/// Why a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Stopped,
    StepComplete,
    EndOfStream,
    Failed,
}

pub(crate) struct PlayerTask {
    id: u64,
    mode: TaskMode,
    ctx: TaskContext,
    stop: Arc<StopSignal>,
}

impl PlayerTask {
    pub(crate) fn new(id: u64, mode: TaskMode, ctx: TaskContext, stop: Arc<StopSignal>) -> Self {
        Self {
            id,
            mode,
            ctx,
            stop,
        }
    }

    pub(crate) fn spawn(self) -> Result<JoinHandle<()>, PlayerError> {
        thread::Builder::new()
            .name(format!("logplay-player-{}", self.id))
            .spawn(move || self.run())
            .map_err(|source| PlayerError::Spawn {
                name: "player",
                source,
            })
    }

    fn run(self) {
        let observer = Arc::clone(&self.ctx.observer);
        self.ctx.slot.started(|| observer.playing_changed(true));

        let outcome = self.replay();
        tracing::debug!(id = self.id, ?outcome, "Player task finished");

        self.ctx
            .slot
            .finish(self.id, || observer.playing_changed(false));
    }

    fn read(&self) -> Result<(Record, f64), PlayerError> {
        if let Some(pending) = self.ctx.log.take_pending() {
            return Ok(pending);
        }
        self.ctx.log.with(|log| {
            let record = log.read_next()?;
            let fraction = log.position_fraction()?;
            Ok((record, fraction))
        })
    }

    fn replay(&self) -> Outcome {
        let mut clock = PlaybackClock::new(self.ctx.max_wait);
        let mut throttle = Throttle::new(self.ctx.display_interval);
        let mut meter = SpeedMeter::default();
        let time_offset = self.ctx.log.info().time_offset;

        loop {
            if self.stop.is_requested() {
                return Outcome::Stopped;
            }

            let (record, fraction) = match self.read() {
                Ok(read) => read,
                Err(PlayerError::Log(LogError::EndOfStream)) => return Outcome::EndOfStream,
                Err(e) => {
                    tracing::error!(error = %e, "Playback read failed");
                    return Outcome::Failed;
                }
            };

            let pacing = clock.pace(record.timestamp, self.ctx.speed.index(), Instant::now());
            if let Some(hole) = pacing.hole {
                tracing::warn!(
                    from = hole.from,
                    to = hole.to,
                    seconds = hole.seconds(),
                    "Hole in log"
                );
                self.ctx.observer.hole_detected(&hole);
            }

            // A stop may arrive while we sleep; the record goes back so the
            // next run starts with it
            if self.stop.wait(pacing.wait) {
                self.ctx.log.unread(record, fraction);
                return Outcome::Stopped;
            }

            let filter = self.ctx.filters.lookup(&record.channel);
            if filter.publishes() {
                if let Err(e) = self.ctx.sink.publish(&filter.outchannel, &record.payload) {
                    tracing::warn!(channel = %filter.outchannel, error = %e, "Publish failed");
                }
            }

            let now = Instant::now();
            let actual_speed = meter.sample(now, record.timestamp);
            if throttle.ready(now) {
                self.ctx.observer.position_changed(&PositionUpdate {
                    fraction,
                    event_number: record.event_number,
                    timestamp: record.timestamp,
                    relative_time: record.timestamp - time_offset,
                    actual_speed,
                });
            }

            if let TaskMode::Step(prefix) = &self.mode {
                if record.channel.starts_with(prefix.as_str()) {
                    return Outcome::StepComplete;
                }
            }
        }
    }
}
