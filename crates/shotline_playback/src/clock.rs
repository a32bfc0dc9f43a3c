//! Transport state for previewing the arrangement: play/pause/stop, seeking,
//! frame stepping and the per-tick cursor advance.

use crate::error::{PlaybackError, Result};
use shotline_core::config::PlaybackSettings;
use shotline_core::types::TimeUs;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Cursor is at 0 and nothing advances.
    #[default]
    Stopped,
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Backward,
}

/// Issued by [`PlaybackClock::play`]. A tick carrying an older token than
/// the clock's current one is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced(TimeUs),
    /// The cursor reached the end and the clock stopped itself.
    Finished,
    /// The tick arrived after pause/stop (or a newer play) and did nothing.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,
    cursor: TimeUs,
    total: TimeUs,
    speed: f64,
    tick_interval: Duration,
    frame_duration: TimeUs,
    generation: u64,
}

impl PlaybackClock {
    pub fn new(settings: &PlaybackSettings, total: TimeUs) -> Self {
        Self {
            state: PlaybackState::Stopped,
            cursor: TimeUs::ZERO,
            total: total.max(TimeUs::ZERO),
            speed: 1.0,
            // tokio intervals reject a zero period
            tick_interval: settings.tick_interval().max(Duration::from_millis(1)),
            frame_duration: settings.frame_duration_us(),
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> TimeUs {
        self.cursor
    }

    pub fn total_duration(&self) -> TimeUs {
        self.total
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Start or resume advancing. Calling it while already playing keeps the
    /// running token valid.
    pub fn play(&mut self) -> TickToken {
        if self.state != PlaybackState::Playing {
            self.generation += 1;
            self.state = PlaybackState::Playing;
            tracing::debug!(cursor = %self.cursor, speed = self.speed, "Playback started");
        }
        TickToken {
            generation: self.generation,
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.generation += 1;
            self.state = PlaybackState::Paused;
            tracing::debug!(cursor = %self.cursor, "Playback paused");
        }
    }

    pub fn stop(&mut self) {
        self.generation += 1;
        self.state = PlaybackState::Stopped;
        self.cursor = TimeUs::ZERO;
        tracing::debug!("Playback stopped");
    }

    /// Move the cursor, clamped to `[0, total]`. The transport state is kept.
    pub fn seek(&mut self, t: TimeUs) {
        self.cursor = t.clamp_to(TimeUs::ZERO, self.total);
    }

    pub fn frame_step(&mut self, direction: StepDirection) {
        let target = match direction {
            StepDirection::Forward => self.cursor + self.frame_duration,
            StepDirection::Backward => self.cursor - self.frame_duration,
        };
        self.seek(target);
    }

    /// Takes effect on the next tick.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(PlaybackError::InvalidSpeed(speed));
        }
        self.speed = speed;
        tracing::debug!(speed, "Playback speed changed");
        Ok(())
    }

    /// Follow edits to the arrangement length. The cursor is re-clamped.
    pub fn set_total_duration(&mut self, total: TimeUs) {
        self.total = total.max(TimeUs::ZERO);
        self.seek(self.cursor);
    }

    /// Advance the cursor by one tick interval scaled by the speed.
    ///
    /// Reaching the end stops the clock, which also puts the cursor back at 0.
    pub fn tick(&mut self, token: TickToken) -> TickOutcome {
        if token.generation != self.generation || self.state != PlaybackState::Playing {
            return TickOutcome::Cancelled;
        }

        let step = TimeUs(self.tick_interval.as_micros() as i64).mul_f64(self.speed);
        let next = self.cursor + step;
        if next >= self.total {
            tracing::debug!(total = %self.total, "Playback reached the end");
            self.stop();
            return TickOutcome::Finished;
        }
        self.seek(next);
        TickOutcome::Advanced(self.cursor)
    }
}
