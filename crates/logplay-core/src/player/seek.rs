//! Seeking
//!
//! Repositions the log while preserving play/pause state: a running task
//! is stopped and joined before the log is touched, and a fresh task is
//! started afterwards.

use super::controller::PlaybackController;
use crate::error::PlayerError;
use crate::feedback::PositionUpdate;

/// Clamp a seek target into `[0, 1]`; NaN goes to the start
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

impl PlaybackController {
    /// Move playback to `ratio` of the log
    pub fn seek(&mut self, ratio: f64) -> Result<(), PlayerError> {
        let ratio = clamp_ratio(ratio);

        let was_playing = self.stop();
        self.reposition(ratio)?;
        if was_playing {
            self.play()?;
        }
        Ok(())
    }

    /// Seek, read one record for the position display, then seek back so
    /// the next run starts exactly at `ratio`.
    fn reposition(&mut self, ratio: f64) -> Result<(), PlayerError> {
        self.ctx.log.take_pending();
        let (probe, fraction) = self.ctx.log.with(|log| {
            log.seek_fraction(ratio)?;
            let probe = log.read_next();
            log.seek_fraction(ratio)?;
            Ok((probe, log.position_fraction()?))
        })?;

        match probe {
            Ok(record) => {
                let time_offset = self.ctx.log.info().time_offset;
                self.ctx.observer.position_changed(&PositionUpdate {
                    fraction,
                    event_number: record.event_number,
                    timestamp: record.timestamp,
                    relative_time: record.timestamp - time_offset,
                    actual_speed: None,
                });
            }
            Err(e) if e.is_end_of_stream() => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(ratio, fraction, "Seeked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_ratio() {
        assert_eq!(clamp_ratio(-0.5), 0.0);
        assert_eq!(clamp_ratio(1.5), 1.0);
        assert_eq!(clamp_ratio(0.25), 0.25);
        assert_eq!(clamp_ratio(f64::NAN), 0.0);
    }
}
