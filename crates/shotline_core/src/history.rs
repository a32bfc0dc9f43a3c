use crate::conflicts::auto_fix;
use crate::error::{CoreError, Result};
use crate::types::*;
use std::cell::RefCell;
use uuid::Uuid;

/// A command that can be executed, undone, and described.
pub trait Command: std::fmt::Debug {
    fn execute(&self, timeline: &mut Timeline) -> Result<()>;
    fn undo(&self, timeline: &mut Timeline) -> Result<()>;
    fn description(&self) -> &str;
}

/// Undo and redo stacks for timeline edits.
///
/// The undo stack holds at most `max_size` commands; once full, the oldest
/// edit is evicted and can no longer be undone. Any new edit empties the redo
/// stack.
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Execute a command and push it onto the undo stack. Clears redo stack.
    /// A failed command is dropped and leaves both stacks untouched.
    pub fn execute(&mut self, cmd: Box<dyn Command>, timeline: &mut Timeline) -> Result<()> {
        cmd.execute(timeline)?;
        self.redo_stack.clear();
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        Ok(())
    }

    /// Undo the last command.
    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let cmd = self.undo_stack.pop().ok_or(CoreError::NothingToUndo)?;
        cmd.undo(timeline)?;
        self.redo_stack.push(cmd);
        Ok(())
    }

    /// Redo the last undone command.
    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let cmd = self.redo_stack.pop().ok_or(CoreError::NothingToRedo)?;
        cmd.execute(timeline)?;
        self.undo_stack.push(cmd);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|cmd| cmd.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|cmd| cmd.description())
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AddClipCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AddClipCommand {
    track_id: Uuid,
    clip: Clip,
}

impl AddClipCommand {
    pub fn new(track_id: Uuid, clip: Clip) -> Self {
        Self { track_id, clip }
    }
}

impl Command for AddClipCommand {
    fn execute(&self, timeline: &mut Timeline) -> Result<()> {
        timeline.add_clip(self.track_id, self.clip.clone())
    }

    fn undo(&self, timeline: &mut Timeline) -> Result<()> {
        timeline.remove_clip(self.clip.id).map(|_| ())
    }

    fn description(&self) -> &str {
        "Add clip"
    }
}

// ---------------------------------------------------------------------------
// RemoveClipCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RemovedClip {
    track_id: Uuid,
    index: usize,
    clip: Clip,
}

#[derive(Debug)]
pub struct RemoveClipCommand {
    clip_id: Uuid,
    removed: RefCell<Option<RemovedClip>>,
}

impl RemoveClipCommand {
    pub fn new(clip_id: Uuid) -> Self {
        Self {
            clip_id,
            removed: RefCell::new(None),
        }
    }
}

impl Command for RemoveClipCommand {
    fn execute(&self, timeline: &mut Timeline) -> Result<()> {
        let (track_idx, index) = timeline
            .find_clip_location(self.clip_id)
            .ok_or(CoreError::ClipNotFound(self.clip_id))?;
        let track_id = timeline.tracks[track_idx].id;
        let clip = timeline.remove_clip(self.clip_id)?;
        *self.removed.borrow_mut() = Some(RemovedClip {
            track_id,
            index,
            clip,
        });
        Ok(())
    }

    fn undo(&self, timeline: &mut Timeline) -> Result<()> {
        let removed = self
            .removed
            .borrow_mut()
            .take()
            .ok_or_else(|| CoreError::InvalidOperation("no removed clip saved".into()))?;
        timeline.insert_clip_at(removed.track_id, removed.index, removed.clip)
    }

    fn description(&self) -> &str {
        "Remove clip"
    }
}

// ---------------------------------------------------------------------------
// TrimCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct TrimCommand {
    clip_id: Uuid,
    new_in_us: TimeUs,
    new_out_us: TimeUs,
    min_duration_us: TimeUs,
    old_points: RefCell<Option<(TimeUs, TimeUs)>>,
}

impl TrimCommand {
    pub fn new(clip_id: Uuid, new_in_us: TimeUs, new_out_us: TimeUs, min_duration_us: TimeUs) -> Self {
        Self {
            clip_id,
            new_in_us,
            new_out_us,
            min_duration_us,
            old_points: RefCell::new(None),
        }
    }
}

impl Command for TrimCommand {
    fn execute(&self, timeline: &mut Timeline) -> Result<()> {
        let clip = timeline.find_clip(self.clip_id)?;
        let old = (clip.source_in_us, clip.source_out_us);
        timeline.trim(self.clip_id, self.new_in_us, self.new_out_us, self.min_duration_us)?;
        *self.old_points.borrow_mut() = Some(old);
        Ok(())
    }

    fn undo(&self, timeline: &mut Timeline) -> Result<()> {
        let (old_in, old_out) = self
            .old_points
            .borrow()
            .ok_or_else(|| CoreError::InvalidOperation("no old trim points saved".into()))?;
        timeline.set_trim_points(self.clip_id, old_in, old_out)
    }

    fn description(&self) -> &str {
        "Trim clip"
    }
}

// ---------------------------------------------------------------------------
// ReorderCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ReorderCommand {
    track_id: Uuid,
    dragged_id: Uuid,
    target_id: Uuid,
    previous: RefCell<Option<Vec<Clip>>>,
}

impl ReorderCommand {
    pub fn new(track_id: Uuid, dragged_id: Uuid, target_id: Uuid) -> Self {
        Self {
            track_id,
            dragged_id,
            target_id,
            previous: RefCell::new(None),
        }
    }
}

impl Command for ReorderCommand {
    fn execute(&self, timeline: &mut Timeline) -> Result<()> {
        let before = timeline.track(self.track_id)?.clips.clone();
        timeline.reorder(self.track_id, self.dragged_id, self.target_id)?;
        *self.previous.borrow_mut() = Some(before);
        Ok(())
    }

    fn undo(&self, timeline: &mut Timeline) -> Result<()> {
        let previous = self
            .previous
            .borrow_mut()
            .take()
            .ok_or_else(|| CoreError::InvalidOperation("no previous arrangement saved".into()))?;
        timeline.replace_clips(self.track_id, previous).map(|_| ())
    }

    fn description(&self) -> &str {
        "Reorder clips"
    }
}

// ---------------------------------------------------------------------------
// AutoFixCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AutoFixCommand {
    conflict: Conflict,
    previous: RefCell<Option<(Uuid, TimeUs)>>,
}

impl AutoFixCommand {
    pub fn new(conflict: Conflict) -> Self {
        Self {
            conflict,
            previous: RefCell::new(None),
        }
    }
}

impl Command for AutoFixCommand {
    fn execute(&self, timeline: &mut Timeline) -> Result<()> {
        let outcome = auto_fix(timeline, &self.conflict)?;
        *self.previous.borrow_mut() = Some((outcome.clip_id, outcome.old_start_us));
        Ok(())
    }

    fn undo(&self, timeline: &mut Timeline) -> Result<()> {
        let (clip_id, old_start) = self
            .previous
            .borrow()
            .ok_or_else(|| CoreError::InvalidOperation("no previous start saved".into()))?;
        timeline.set_clip_start(clip_id, old_start)
    }

    fn description(&self) -> &str {
        "Fix overlap"
    }
}
