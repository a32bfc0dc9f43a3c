//! The host-facing editing session.
//!
//! `Editor` owns the live timeline and everything derived from it. Every
//! mutation goes through the undo history and is followed, before the call
//! returns, by a fresh conflict analysis and the matching events.

use crate::config::EngineConfig;
use crate::conflicts::{detect_timeline_conflicts, CanonicalOrder};
use crate::editing::TrimOutcome;
use crate::error::{CoreError, Result};
use crate::events::{EngineEvent, EventBus, ListenerId};
use crate::history::*;
use crate::project::{TimelineDocument, VersionStore};
use crate::snapping::collect_snap_points;
use crate::transitions::{TransitionMarker, TransitionRegistry};
use crate::types::*;
use crate::viewport::Viewport;
use uuid::Uuid;

#[derive(Debug)]
pub struct Editor {
    config: EngineConfig,
    timeline: Timeline,
    transitions: TransitionRegistry,
    versions: VersionStore,
    history: History,
    viewport: Viewport,
    canonical: Option<CanonicalOrder>,
    conflicts: Vec<Conflict>,
    events: EventBus,
}

impl Editor {
    pub fn new(config: EngineConfig, timeline: Timeline) -> Self {
        let mut editor = Self {
            history: History::new(config.history_size),
            viewport: Viewport::new(config.zoom.clone()),
            config,
            timeline,
            transitions: TransitionRegistry::new(),
            versions: VersionStore::new(),
            canonical: None,
            conflicts: vec![],
            events: EventBus::new(),
        };
        editor.conflicts = editor.analyze();
        editor
    }

    /// Open a saved document. Fails with `InvalidClip` if any clip in the
    /// timeline or its versions breaks the interval invariants.
    pub fn from_document(config: EngineConfig, document: TimelineDocument) -> Result<Self> {
        document.validate()?;
        let mut editor = Self::new(config, document.timeline);
        editor.transitions = TransitionRegistry::from_transitions(document.transitions);
        editor.versions = VersionStore::from_versions(document.versions);
        Ok(editor)
    }

    pub fn to_document(&self) -> TimelineDocument {
        TimelineDocument {
            timeline: self.timeline.clone(),
            transitions: self.transitions.all().to_vec(),
            versions: self.versions.to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn transitions(&self) -> &TransitionRegistry {
        &self.transitions
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Conflicts from the most recent analysis, in track order.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn total_duration_us(&self) -> TimeUs {
        self.timeline.total_duration_us()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Viewport
    // -----------------------------------------------------------------------

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_zoom(&mut self, pixels_per_second: f64) {
        self.viewport.set_zoom(pixels_per_second);
    }

    pub fn fit_to_window(&mut self, viewport_width_px: f64) {
        let total = self.total_duration_us();
        self.viewport.fit_to_window(viewport_width_px, total);
    }

    /// Time under the pointer, snapped to nearby clip edges and transitions.
    /// The dragged clip, if any, is not a snap target.
    pub fn pointer_to_time(&self, x: f64, dragged_clip: Option<Uuid>) -> TimeUs {
        let points = collect_snap_points(&self.timeline, self.transitions.all(), dragged_clip);
        self.viewport
            .pointer_to_time(x, &points, self.config.snap_threshold_px)
    }

    pub fn transition_marker(&self, id: Uuid) -> Result<TransitionMarker> {
        self.transitions.marker(id, &self.viewport)
    }

    // -----------------------------------------------------------------------
    // Canonical order
    // -----------------------------------------------------------------------

    /// Set or clear the authored order used for the order check.
    pub fn set_canonical_order(&mut self, order: Option<CanonicalOrder>) {
        self.canonical = order;
        self.refresh_conflicts();
    }

    // -----------------------------------------------------------------------
    // Clip edits
    // -----------------------------------------------------------------------

    pub fn add_clip(&mut self, track_id: Uuid, clip: Clip) -> Result<()> {
        let clip_id = clip.id;
        self.apply(Box::new(AddClipCommand::new(track_id, clip)))?;
        self.finish(EngineEvent::ClipAdded { clip_id });
        Ok(())
    }

    pub fn remove_clip(&mut self, clip_id: Uuid) -> Result<()> {
        self.apply(Box::new(RemoveClipCommand::new(clip_id)))?;
        self.finish(EngineEvent::ClipRemoved { clip_id });
        Ok(())
    }

    pub fn trim(&mut self, clip_id: Uuid, new_in: TimeUs, new_out: TimeUs) -> Result<TrimOutcome> {
        let min = self.config.min_clip_duration_us;
        self.apply(Box::new(TrimCommand::new(clip_id, new_in, new_out, min)))?;

        let clip = self.timeline.find_clip(clip_id)?;
        let outcome = TrimOutcome {
            source_in_us: clip.source_in_us,
            source_out_us: clip.source_out_us,
            clamped: clip.source_in_us != new_in || clip.source_out_us != new_out,
        };
        self.finish(EngineEvent::ClipTrimmed { clip_id, outcome });
        Ok(outcome)
    }

    pub fn trim_in(&mut self, clip_id: Uuid, new_in: TimeUs) -> Result<TrimOutcome> {
        let out = self.timeline.find_clip(clip_id)?.source_out_us;
        self.trim(clip_id, new_in, out)
    }

    pub fn trim_out(&mut self, clip_id: Uuid, new_out: TimeUs) -> Result<TrimOutcome> {
        let source_in = self.timeline.find_clip(clip_id)?.source_in_us;
        self.trim(clip_id, source_in, new_out)
    }

    pub fn reorder(&mut self, track_id: Uuid, dragged_id: Uuid, target_id: Uuid) -> Result<()> {
        self.apply(Box::new(ReorderCommand::new(track_id, dragged_id, target_id)))?;
        self.finish(EngineEvent::TrackReordered { track_id });
        Ok(())
    }

    /// Apply the automatic fix for one reported conflict. Only overlaps qualify.
    pub fn fix_conflict(&mut self, conflict: &Conflict) -> Result<()> {
        if conflict.kind != ConflictKind::Overlap {
            return Err(CoreError::NotAutoFixable(conflict.kind));
        }
        let clip_id = conflict.clip_ids.get(1).copied().ok_or_else(|| {
            CoreError::InvalidOperation("overlap conflict must name two clips".into())
        })?;
        self.apply(Box::new(AutoFixCommand::new(conflict.clone())))?;

        let new_start_us = self.timeline.find_clip(clip_id)?.timeline_start_us;
        self.finish(EngineEvent::OverlapFixed { clip_id, new_start_us });
        Ok(())
    }

    /// Fix overlaps one at a time, re-analysing after each fix so cascades are
    /// picked up, until none remain. Returns how many fixes were applied.
    pub fn fix_all_overlaps(&mut self) -> Result<usize> {
        let clip_count: usize = self.timeline.tracks.iter().map(|t| t.clips.len()).sum();
        let limit = clip_count * clip_count + 1;
        let mut applied = 0;

        while let Some(conflict) = self
            .conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::Overlap)
            .cloned()
        {
            if applied >= limit {
                return Err(CoreError::InvalidOperation(
                    "overlap fixes did not converge".into(),
                ));
            }
            self.fix_conflict(&conflict)?;
            applied += 1;
        }
        Ok(applied)
    }

    pub fn undo(&mut self) -> Result<()> {
        let description = self.history.undo_description().unwrap_or_default().to_string();
        self.history.undo(&mut self.timeline)?;
        self.finish(EngineEvent::Undone { description });
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        let description = self.history.redo_description().unwrap_or_default().to_string();
        self.history.redo(&mut self.timeline)?;
        self.finish(EngineEvent::Redone { description });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    pub fn add_transition(
        &mut self,
        from_clip_id: Uuid,
        to_clip_id: Uuid,
        kind: TransitionKind,
        duration: TimeUs,
    ) -> Result<Uuid> {
        let id = self
            .transitions
            .add(&self.timeline, from_clip_id, to_clip_id, kind, duration)?;
        self.events.emit(&EngineEvent::TransitionsChanged);
        Ok(id)
    }

    pub fn update_transition(&mut self, id: Uuid, kind: TransitionKind, duration: TimeUs) -> Result<()> {
        self.transitions.update(id, kind, duration)?;
        self.events.emit(&EngineEvent::TransitionsChanged);
        Ok(())
    }

    pub fn remove_transition(&mut self, id: Uuid) -> Result<Transition> {
        let removed = self.transitions.remove(id)?;
        self.events.emit(&EngineEvent::TransitionsChanged);
        Ok(removed)
    }

    pub fn reanchor_transition(&mut self, id: Uuid) -> Result<TimeUs> {
        let position = self.transitions.reanchor(id, &self.timeline)?;
        self.events.emit(&EngineEvent::TransitionsChanged);
        Ok(position)
    }

    /// Populate transitions and the canonical order from the shot list.
    pub fn load_shots(&mut self, shots: &[Shot], clips: &[ShotClip]) -> usize {
        let seeded = self.transitions.seed_from_shots(&self.timeline, shots, clips);
        if seeded > 0 {
            self.events.emit(&EngineEvent::TransitionsChanged);
        }
        self.set_canonical_order(Some(CanonicalOrder::from_shots(shots, clips)));
        seeded
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    pub fn save_version(&mut self, name: Option<String>) -> u32 {
        let version = self.versions.save_version(&mut self.timeline, name);
        self.events.emit(&EngineEvent::VersionSaved { version });
        version
    }

    /// Replace the live timeline with a saved version. Undo history is dropped
    /// because it describes edits to the replaced timeline.
    pub fn restore_version(&mut self, version: u32) -> Result<()> {
        self.timeline = self.versions.restore_version(version)?;
        self.history.clear();
        self.finish(EngineEvent::VersionRestored { version });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn apply(&mut self, cmd: Box<dyn Command>) -> Result<()> {
        tracing::debug!(command = cmd.description(), "Applying edit");
        self.history.execute(cmd, &mut self.timeline)
    }

    /// Re-analyze, then announce the edit followed by the new conflict totals.
    fn finish(&mut self, event: EngineEvent) {
        self.conflicts = self.analyze();
        self.events.emit(&event);
        self.emit_conflict_totals();
    }

    fn analyze(&self) -> Vec<Conflict> {
        detect_timeline_conflicts(
            &self.timeline,
            self.canonical.as_ref(),
            self.config.gap_threshold_us,
        )
    }

    fn refresh_conflicts(&mut self) {
        self.conflicts = self.analyze();
        self.emit_conflict_totals();
    }

    fn emit_conflict_totals(&mut self) {
        let errors = self
            .conflicts
            .iter()
            .filter(|c| c.severity == Severity::Error)
            .count();
        self.events.emit(&EngineEvent::ConflictsUpdated {
            total: self.conflicts.len(),
            errors,
        });
    }
}
