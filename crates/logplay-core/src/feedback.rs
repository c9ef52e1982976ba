//! Playback feedback
//!
//! Position, play state and timing-hole notifications for whatever is
//! displaying the player (a GUI, a terminal status line, logs).

use chrono::DateTime;
use std::time::{Duration, Instant};

/// Where playback currently is
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    /// Cursor position as a fraction of the log
    pub fraction: f64,
    /// Sequence number of the last record handled
    pub event_number: i64,
    /// Capture time of the last record handled, in microseconds
    pub timestamp: i64,
    /// Microseconds since the first record of the log
    pub relative_time: i64,
    /// Measured playback rate (log seconds per wall second)
    pub actual_speed: Option<f64>,
}

impl PositionUpdate {
    /// Render the record time, either relative to the log start or as an
    /// absolute UTC timestamp.
    pub fn format_time(&self, absolute: bool) -> String {
        if absolute {
            if let Some(dt) = DateTime::from_timestamp_micros(self.timestamp) {
                return dt.format("%Y.%m.%d %H:%M:%S%.3f UTC").to_string();
            }
        }
        format!("{:.3} s", self.relative_time as f64 / 1_000_000.0)
    }
}

/// A gap between consecutive records larger than the maximum wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingHole {
    /// Timestamp of the record before the gap (us)
    pub from: i64,
    /// Timestamp of the record after the gap (us)
    pub to: i64,
}

impl TimingHole {
    /// Gap length in seconds
    pub fn seconds(&self) -> f64 {
        (self.to - self.from) as f64 / 1_000_000.0
    }
}

/// Receives playback notifications. Called from the command thread and
/// from playback task threads.
pub trait PlaybackObserver: Send + Sync {
    /// A player task started (`true`) or ended (`false`).
    ///
    /// Runs with the task-slot lock held. `TaskSlot::is_playing` is safe to
    /// call from here; `TaskSlot::active_mode` and anything that starts or
    /// stops playback synchronously will deadlock.
    fn playing_changed(&self, _playing: bool) {}

    /// Playback moved; throttled to the display interval
    fn position_changed(&self, _update: &PositionUpdate) {}

    /// A gap longer than the maximum wait was found
    fn hole_detected(&self, _hole: &TimingHole) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PlaybackObserver for NullObserver {}

/// Observer that reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver {
    /// Show absolute timestamps instead of log-relative ones
    pub absolute_time: bool,
}

impl PlaybackObserver for TracingObserver {
    fn playing_changed(&self, playing: bool) {
        tracing::info!(playing, "Playback state changed");
    }

    fn position_changed(&self, update: &PositionUpdate) {
        tracing::debug!(
            event = update.event_number,
            position = format_args!("{:.4}", update.fraction),
            time = %update.format_time(self.absolute_time),
            speed = ?update.actual_speed,
            "Position"
        );
    }

    fn hole_detected(&self, hole: &TimingHole) {
        tracing::info!(
            from = hole.from,
            to = hole.to,
            seconds = hole.seconds(),
            "Hole in log"
        );
    }
}

/// Rate limiter for position updates
#[derive(Debug)]
pub(crate) struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if at least `interval` has passed since the last true
    pub(crate) fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Measures actual playback rate over windows of at least half a second
#[derive(Debug, Default)]
pub(crate) struct SpeedMeter {
    last: Option<(Instant, i64)>,
    current: Option<f64>,
}

const SPEED_WINDOW: Duration = Duration::from_millis(500);

impl SpeedMeter {
    pub(crate) fn sample(&mut self, now: Instant, timestamp: i64) -> Option<f64> {
        match self.last {
            None => self.last = Some((now, timestamp)),
            Some((then, then_timestamp)) => {
                let dt = now.duration_since(then);
                if dt >= SPEED_WINDOW {
                    let log_seconds = (timestamp - then_timestamp) as f64 / 1_000_000.0;
                    self.current = Some(log_seconds / dt.as_secs_f64());
                    self.last = Some((now, timestamp));
                }
            }
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_limits_rate() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(100));
        assert!(throttle.ready(start));
        assert!(!throttle.ready(start + Duration::from_millis(50)));
        assert!(throttle.ready(start + Duration::from_millis(100)));
        assert!(!throttle.ready(start + Duration::from_millis(199)));
    }

    #[test]
    fn test_speed_meter_window() {
        let start = Instant::now();
        let mut meter = SpeedMeter::default();
        assert_eq!(meter.sample(start, 0), None);
        assert_eq!(meter.sample(start + Duration::from_millis(100), 200_000), None);
        let speed = meter
            .sample(start + Duration::from_secs(1), 2_000_000)
            .unwrap();
        assert!((speed - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_format_time() {
        let update = PositionUpdate {
            fraction: 0.5,
            event_number: 10,
            timestamp: 1_000_000,
            relative_time: 1_500_000,
            actual_speed: None,
        };
        assert_eq!(update.format_time(false), "1.500 s");
        assert_eq!(update.format_time(true), "1970.01.01 00:00:01.000 UTC");
    }

    #[test]
    fn test_hole_seconds() {
        let hole = TimingHole {
            from: 0,
            to: 10_000_000,
        };
        assert_eq!(hole.seconds(), 10.0);
    }
}
