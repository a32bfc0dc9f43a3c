//! Transitions keyed by the boundary between two clips.
//!
//! A transition records its timeline position once, from the end of the
//! outgoing clip, and keeps it through later trims and reorders. Call
//! [`TransitionRegistry::reanchor`] to move it back onto the current boundary.

use crate::error::{CoreError, Result};
use crate::types::*;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default length given to non-cut transitions seeded from shots.
pub const DEFAULT_TRANSITION_US: TimeUs = TimeUs(500_000);

/// Where to draw a transition, in pixels from the timeline origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionMarker {
    pub x_px: f64,
    pub width_px: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransitionRegistry {
    transitions: Vec<Transition>,
}

impl TransitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transitions(transitions: Vec<Transition>) -> Self {
        Self { transitions }
    }

    pub fn all(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn get(&self, id: Uuid) -> Result<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.id == id)
            .ok_or(CoreError::TransitionNotFound(id))
    }

    /// Set the transition between two clips, positioned at the current end of
    /// `from_clip_id`. An existing transition on the same boundary is updated in
    /// place and keeps its id and position.
    pub fn add(
        &mut self,
        timeline: &Timeline,
        from_clip_id: Uuid,
        to_clip_id: Uuid,
        kind: TransitionKind,
        duration: TimeUs,
    ) -> Result<Uuid> {
        let position = timeline.find_clip(from_clip_id)?.timeline_end_us();
        timeline.find_clip(to_clip_id)?;
        let duration = normalized_duration(kind, duration)?;

        if let Some(existing) = self
            .transitions
            .iter_mut()
            .find(|t| t.from_clip_id == from_clip_id && t.to_clip_id == to_clip_id)
        {
            existing.kind = kind;
            existing.duration_us = duration;
            return Ok(existing.id);
        }

        let transition = Transition {
            id: Uuid::new_v4(),
            from_clip_id,
            to_clip_id,
            kind,
            duration_us: duration,
            position_us: position,
        };
        let id = transition.id;
        self.transitions.push(transition);
        Ok(id)
    }

    /// Change the effect of an existing transition. Position is untouched.
    pub fn update(&mut self, id: Uuid, kind: TransitionKind, duration: TimeUs) -> Result<()> {
        let duration = normalized_duration(kind, duration)?;
        let transition = self
            .transitions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(CoreError::TransitionNotFound(id))?;
        transition.kind = kind;
        transition.duration_us = duration;
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Transition> {
        let pos = self
            .transitions
            .iter()
            .position(|t| t.id == id)
            .ok_or(CoreError::TransitionNotFound(id))?;
        Ok(self.transitions.remove(pos))
    }

    pub fn find_by_boundary(&self, from_clip_id: Uuid, to_clip_id: Uuid) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.from_clip_id == from_clip_id && t.to_clip_id == to_clip_id)
    }

    /// Move a transition to the current end of its outgoing clip.
    pub fn reanchor(&mut self, id: Uuid, timeline: &Timeline) -> Result<TimeUs> {
        let from_clip_id = self.get(id)?.from_clip_id;
        let position = timeline.find_clip(from_clip_id)?.timeline_end_us();
        if let Some(transition) = self.transitions.iter_mut().find(|t| t.id == id) {
            transition.position_us = position;
        }
        Ok(position)
    }

    /// Pixel placement of a transition from its stored position and duration.
    pub fn marker(&self, id: Uuid, viewport: &Viewport) -> Result<TransitionMarker> {
        let transition = self.get(id)?;
        Ok(TransitionMarker {
            x_px: viewport.time_to_pixel(transition.position_us),
            width_px: viewport.time_to_pixel(transition.duration_us),
        })
    }

    /// Create transitions for every shot that names a previous shot and a
    /// transition type, between the selected clips of the two shots.
    /// Pairs whose clips are missing from the timeline are skipped. Returns the
    /// number of transitions added or updated.
    pub fn seed_from_shots(&mut self, timeline: &Timeline, shots: &[Shot], clips: &[ShotClip]) -> usize {
        let selected: HashMap<Uuid, Uuid> = clips
            .iter()
            .filter(|c| c.selected)
            .map(|c| (c.shot_id, c.id))
            .collect();

        let mut seeded = 0;
        for shot in shots {
            let (Some(previous), Some(kind)) = (shot.previous_shot_id, shot.transition_type) else {
                continue;
            };
            let (Some(&from), Some(&to)) = (selected.get(&previous), selected.get(&shot.id)) else {
                tracing::warn!(shot = %shot.id, "No selected clip for transition boundary");
                continue;
            };
            let duration = match kind {
                TransitionKind::Cut => TimeUs::ZERO,
                _ => DEFAULT_TRANSITION_US,
            };
            match self.add(timeline, from, to, kind, duration) {
                Ok(_) => seeded += 1,
                Err(e) => tracing::warn!(shot = %shot.id, error = %e, "Skipped transition seed"),
            }
        }
        seeded
    }
}

fn normalized_duration(kind: TransitionKind, duration: TimeUs) -> Result<TimeUs> {
    if kind == TransitionKind::Cut {
        return Ok(TimeUs::ZERO);
    }
    if duration < TimeUs::ZERO {
        return Err(CoreError::InvalidOperation(
            "transition duration must not be negative".into(),
        ));
    }
    Ok(duration)
}
