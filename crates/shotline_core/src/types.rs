use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::path::PathBuf;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);

    pub fn from_seconds(s: f64) -> Self {
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn from_millis(ms: u64) -> Self {
        Self(ms as i64 * 1_000)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Scale by a real factor, rounding to the nearest microsecond.
    pub fn mul_f64(self, factor: f64) -> Self {
        Self((self.0 as f64 * factor).round() as i64)
    }

    pub fn clamp_to(self, lo: TimeUs, hi: TimeUs) -> Self {
        Self(self.0.clamp(lo.0, hi.0.max(lo.0)))
    }
}

impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for TimeUs {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for TimeUs {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_us = self.0.unsigned_abs();
        let total_ms = total_us / 1_000;
        let ms = total_ms % 1_000;
        let total_secs = total_ms / 1_000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if self.0 < 0 {
            write!(f, "-{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        } else {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        }
    }
}

// ---------------------------------------------------------------------------
// TrackKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// A trimmed span of source media placed on a track.
///
/// The effective duration is always `source_out_us - source_in_us`; it is
/// derived rather than stored so it cannot drift from the trim points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: Uuid,
    pub track_id: Uuid,
    pub timeline_start_us: TimeUs,
    pub source_in_us: TimeUs,
    pub source_out_us: TimeUs,
    /// Length of the underlying media, when known. Bounds `source_out_us`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_duration_us: Option<TimeUs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Clip {
    /// Create an untrimmed clip covering `[0, source_duration)` of its media.
    pub fn new(track_id: Uuid, timeline_start_us: TimeUs, source_duration_us: TimeUs) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_id,
            timeline_start_us,
            source_in_us: TimeUs::ZERO,
            source_out_us: source_duration_us,
            source_duration_us: Some(source_duration_us),
            label: None,
            color: None,
            thumbnail: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn duration_us(&self) -> TimeUs {
        self.source_out_us - self.source_in_us
    }

    pub fn timeline_end_us(&self) -> TimeUs {
        self.timeline_start_us + self.duration_us()
    }

    /// Human-facing name: the label if set, otherwise the short form of the id.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.id.to_string()[..8].to_string(),
        }
    }

    /// Check the interval invariants: non-negative start, `0 <= in < out`,
    /// and `out` within the source media when its length is known.
    pub fn validate(&self) -> Result<()> {
        if self.timeline_start_us < TimeUs::ZERO {
            return Err(CoreError::InvalidClip(format!(
                "start {} is negative",
                self.timeline_start_us.0
            )));
        }
        if self.source_in_us < TimeUs::ZERO {
            return Err(CoreError::InvalidClip("source_in must be >= 0".into()));
        }
        if self.source_out_us <= self.source_in_us {
            return Err(CoreError::InvalidClip(
                "source_out must be greater than source_in".into(),
            ));
        }
        if let Some(max) = self.source_duration_us {
            if self.source_out_us > max {
                return Err(CoreError::InvalidClip(format!(
                    "source_out {} exceeds source duration {}",
                    self.source_out_us, max
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// An ordered lane of clips. `clips` is in arrangement order, which only
/// matches start-time order right after a reorder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: Uuid,
    pub kind: TrackKind,
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            clips: vec![],
        }
    }

    pub fn clip(&self, clip_id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    /// Clips sorted by start time. Ties keep arrangement order.
    pub fn clips_by_start(&self) -> Vec<&Clip> {
        let mut sorted: Vec<&Clip> = self.clips.iter().collect();
        sorted.sort_by_key(|c| c.timeline_start_us);
        sorted
    }

    pub fn end_us(&self) -> TimeUs {
        self.clips
            .iter()
            .map(Clip::timeline_end_us)
            .max()
            .unwrap_or(TimeUs::ZERO)
    }
}

// ---------------------------------------------------------------------------
// AudioAssets
// ---------------------------------------------------------------------------

/// External audio beds. Both play from time 0 and are not modeled as clips.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AudioAssets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub audio: AudioAssets,
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Cut,
    Dissolve,
    Fade,
    Wipe,
    Slide,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
    pub id: Uuid,
    pub from_clip_id: Uuid,
    pub to_clip_id: Uuid,
    pub kind: TransitionKind,
    /// Always zero for cuts.
    pub duration_us: TimeUs,
    /// End of `from_clip_id` when the transition was created or last re-anchored.
    pub position_us: TimeUs,
}

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Order,
    Overlap,
    Gap,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One structural problem found on a track. Recomputed on every analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub track_id: Uuid,
    pub message: String,
    /// The earlier clip first, then the later one.
    pub clip_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_us: Option<TimeUs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

// ---------------------------------------------------------------------------
// Shots (supplied by the story/scene layer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shot {
    pub id: Uuid,
    pub sequence_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_shot_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_type: Option<TransitionKind>,
    #[serde(default)]
    pub use_last_frame_as_first: bool,
}

/// A generated clip available for a shot. Its id is the id the clip keeps
/// once placed on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShotClip {
    pub id: Uuid,
    pub shot_id: Uuid,
    pub duration_us: TimeUs,
    #[serde(default)]
    pub selected: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
