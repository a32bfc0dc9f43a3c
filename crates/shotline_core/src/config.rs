use crate::error::{CoreError, Result};
use crate::types::TimeUs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for editing, analysis, zoom and playback.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Shortest span a trim may leave on a clip.
    pub min_clip_duration_us: TimeUs,
    /// Silence between clips longer than this is reported as a gap.
    pub gap_threshold_us: TimeUs,
    pub zoom: ZoomSettings,
    pub playback: PlaybackSettings,
    pub snap_threshold_px: f64,
    pub history_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_clip_duration_us: TimeUs(100_000),
            gap_threshold_us: TimeUs(500_000),
            zoom: ZoomSettings::default(),
            playback: PlaybackSettings::default(),
            snap_threshold_px: 8.0,
            history_size: 100,
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        config.zoom.validate()?;
        Ok(config)
    }
}

/// Pixels-per-second bounds for the timeline view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoomSettings {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    /// Width of the track label column, excluded when fitting to a viewport.
    pub label_gutter_px: f64,
}

impl ZoomSettings {
    /// Bounds must be finite with `0 < min_zoom <= max_zoom`.
    pub fn validate(&self) -> Result<()> {
        let finite = self.min_zoom.is_finite() && self.max_zoom.is_finite();
        if !finite || self.min_zoom <= 0.0 || self.min_zoom > self.max_zoom {
            return Err(CoreError::InvalidOperation(format!(
                "zoom bounds must satisfy 0 < min_zoom <= max_zoom, got {}..{}",
                self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min_zoom: 10.0,
            max_zoom: 200.0,
            default_zoom: 50.0,
            label_gutter_px: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Nominal scrub rate for frame stepping. Not tied to any clip's media.
    pub frame_rate: u32,
    pub tick_interval_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            tick_interval_ms: 33,
        }
    }
}

impl PlaybackSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn frame_duration_us(&self) -> TimeUs {
        TimeUs(1_000_000 / i64::from(self.frame_rate.max(1)))
    }
}
