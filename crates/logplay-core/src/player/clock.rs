//! Playback clock
//!
//! Maps record timestamps onto wall-clock time at the selected speed.
//!
//! The clock keeps an origin pair (record time, wall time). The wait before
//! publishing a record is the record's offset from the origin minus the
//! scaled wall time elapsed since the origin. The origin is rebased whenever
//! the speed changes, and on the record following a timing hole so that
//! playback never bursts to catch up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::feedback::TimingHole;

/// Selectable playback speed multipliers
pub const SPEEDS: [f64; 9] = [0.0, 0.01, 0.1, 0.5, 1.0, 2.0, 4.0, 8.0, 32.0];

/// Index of 1.0x in [`SPEEDS`]
pub const DEFAULT_SPEED_INDEX: usize = 4;

/// Default maximum single wait; longer gaps are treated as holes
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(250);

/// The current speed selection, shared between the controls and the
/// playback task.
#[derive(Debug)]
pub struct SpeedControl {
    index: AtomicUsize,
}

impl Default for SpeedControl {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_INDEX)
    }
}

impl SpeedControl {
    /// Start at `index`, clamped to the table
    pub fn new(index: usize) -> Self {
        Self {
            index: AtomicUsize::new(index.min(SPEEDS.len() - 1)),
        }
    }

    /// Current index into [`SPEEDS`]
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// Speed multiplier for the current index
    pub fn multiplier(&self) -> f64 {
        SPEEDS[self.index()]
    }

    /// Select a speed index, clamped to the table. Returns the new index.
    pub fn set_index(&self, index: usize) -> usize {
        let index = index.min(SPEEDS.len() - 1);
        self.index.store(index, Ordering::Release);
        tracing::debug!(index, speed = SPEEDS[index], "Speed changed");
        index
    }

    /// Step one entry up the table. Returns the new index.
    pub fn faster(&self) -> usize {
        self.step(|i| (i + 1).min(SPEEDS.len() - 1))
    }

    /// Step one entry down the table. Returns the new index.
    pub fn slower(&self) -> usize {
        self.step(|i| i.saturating_sub(1))
    }

    fn step(&self, f: impl Fn(usize) -> usize) -> usize {
        let prev = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some(f(i)))
            .unwrap_or_else(|i| i);
        let index = f(prev);
        tracing::debug!(index, speed = SPEEDS[index], "Speed changed");
        index
    }
}

/// Record time and wall time that playback is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOrigin {
    /// Record timestamp at the origin (us)
    pub record_time: i64,
    /// Wall-clock instant at the origin
    pub wall_clock: Instant,
}

/// How long to hold a record before publishing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Time to sleep before publishing
    pub wait: Duration,
    /// The origin was reset on this record
    pub rebased: bool,
    /// The raw wait exceeded the maximum and was clamped
    pub hole: Option<TimingHole>,
}

/// Per-task timing state
#[derive(Debug)]
pub struct PlaybackClock {
    max_wait: Duration,
    origin: Option<TimeOrigin>,
    speed_index: Option<usize>,
    last_timestamp: Option<i64>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WAIT)
    }
}

impl PlaybackClock {
    /// Clock with no origin; the first record rebases
    pub fn new(max_wait: Duration) -> Self {
        Self {
            max_wait,
            origin: None,
            speed_index: None,
            last_timestamp: None,
        }
    }

    /// Current origin, if any record has been paced
    pub fn origin(&self) -> Option<TimeOrigin> {
        self.origin
    }

    /// Compute the wait for a record with `timestamp`, read at `now` with
    /// speed table entry `speed_index` selected.
    pub fn pace(&mut self, timestamp: i64, speed_index: usize, now: Instant) -> Pacing {
        let speed_index = speed_index.min(SPEEDS.len() - 1);

        let (origin, rebased) = match self.origin {
            Some(origin) if self.speed_index == Some(speed_index) => (origin, false),
            _ => {
                let origin = TimeOrigin {
                    record_time: timestamp,
                    wall_clock: now,
                };
                self.origin = Some(origin);
                self.speed_index = Some(speed_index);
                (origin, true)
            }
        };

        let elapsed_record = timestamp - origin.record_time;
        let elapsed_wall = now.saturating_duration_since(origin.wall_clock).as_micros() as f64;
        let mut wait_us = elapsed_record - (SPEEDS[speed_index] * elapsed_wall) as i64;

        let max_wait_us = self.max_wait.as_micros() as i64;
        let mut hole = None;
        if wait_us > max_wait_us {
            hole = Some(TimingHole {
                from: self.last_timestamp.unwrap_or(origin.record_time),
                to: timestamp,
            });
            wait_us = max_wait_us;
            // Rebase on the next record instead of bursting to catch up
            self.speed_index = None;
        }
        self.last_timestamp = Some(timestamp);

        Pacing {
            wait: Duration::from_micros(wait_us.max(0) as u64),
            rebased,
            hole,
        }
    }
}
