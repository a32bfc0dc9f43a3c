use crate::error::{CoreError, Result};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use uuid::Uuid;

impl Timeline {
    /// Create an empty timeline with no tracks.
    pub fn new(project_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            version: 0,
            version_name: None,
            tracks: vec![],
            audio: AudioAssets::default(),
        }
    }

    /// One video track followed by one audio track, the layout hosts expect.
    pub fn with_default_tracks(project_id: Uuid) -> Self {
        let mut timeline = Self::new(project_id);
        timeline.add_track(TrackKind::Video);
        timeline.add_track(TrackKind::Audio);
        timeline
    }

    /// Check every clip's interval invariants, that each clip's `track_id`
    /// names the track holding it, and that clip ids are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for track in &self.tracks {
            for clip in &track.clips {
                clip.validate()?;
                if clip.track_id != track.id {
                    return Err(CoreError::InvalidClip(format!(
                        "clip {} claims track {} but sits on track {}",
                        clip.id, clip.track_id, track.id
                    )));
                }
                if !seen.insert(clip.id) {
                    return Err(CoreError::InvalidClip(format!(
                        "clip id {} appears more than once",
                        clip.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// An immutable copy of the timeline taken when a version is saved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineVersion {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timeline: Timeline,
}

/// Saved versions keyed by their increasing version number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionStore {
    versions: BTreeMap<u32, TimelineVersion>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_versions(versions: Vec<TimelineVersion>) -> Self {
        Self {
            versions: versions.into_iter().map(|v| (v.version, v)).collect(),
        }
    }

    /// Bump the live timeline's version and keep a deep copy under that number.
    pub fn save_version(&mut self, timeline: &mut Timeline, name: Option<String>) -> u32 {
        let next = timeline
            .version
            .max(self.latest().unwrap_or(0))
            + 1;
        timeline.version = next;
        timeline.version_name = name.clone();
        self.versions.insert(
            next,
            TimelineVersion {
                version: next,
                name,
                timeline: timeline.clone(),
            },
        );
        tracing::info!(version = next, "Timeline version saved");
        next
    }

    /// A fresh copy of a saved version, ready to replace the live timeline.
    pub fn restore_version(&self, version: u32) -> Result<Timeline> {
        let saved = self
            .versions
            .get(&version)
            .ok_or(CoreError::VersionNotFound(version))?;
        tracing::info!(version, "Timeline version restored");
        Ok(saved.timeline.clone())
    }

    pub fn latest(&self) -> Option<u32> {
        self.versions.keys().next_back().copied()
    }

    pub fn list(&self) -> impl Iterator<Item = &TimelineVersion> {
        self.versions.values()
    }

    pub fn to_vec(&self) -> Vec<TimelineVersion> {
        self.versions.values().cloned().collect()
    }
}

/// Everything persisted for one timeline: the live arrangement, its
/// transitions and the saved versions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineDocument {
    pub timeline: Timeline,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub versions: Vec<TimelineVersion>,
}

impl TimelineDocument {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            transitions: vec![],
            versions: vec![],
        }
    }

    /// Save the document to a file as pretty-printed JSON.
    /// Automatically appends `.shotline` extension if not present.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = ensure_extension(path.as_ref());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        tracing::info!(path = %path.display(), "Timeline document saved");
        Ok(())
    }

    /// The live timeline and every saved version must hold valid clips.
    pub fn validate(&self) -> Result<()> {
        self.timeline.validate()?;
        for saved in &self.versions {
            saved.timeline.validate()?;
        }
        Ok(())
    }

    /// Load a document from a JSON file. Documents holding invalid clips are
    /// rejected.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let document: TimelineDocument = serde_json::from_str(&data)?;
        document.validate()?;
        tracing::info!(path = %path.as_ref().display(), "Timeline document loaded");
        Ok(document)
    }
}

fn ensure_extension(path: &Path) -> std::path::PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some("shotline") {
        path.to_path_buf()
    } else {
        let mut p = path.to_path_buf();
        let mut name = p.file_name().unwrap_or_default().to_os_string();
        name.push(".shotline");
        p.set_file_name(name);
        p
    }
}
