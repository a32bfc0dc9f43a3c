use crate::error::{CoreError, Result};
use crate::types::*;
use uuid::Uuid;

/// Trim points actually applied after bounds and minimum-duration clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimOutcome {
    pub source_in_us: TimeUs,
    pub source_out_us: TimeUs,
    pub clamped: bool,
}

impl Timeline {
    pub fn add_track(&mut self, kind: TrackKind) -> Uuid {
        let track = Track::new(kind);
        let id = track.id;
        self.tracks.push(track);
        id
    }

    pub fn track(&self, track_id: Uuid) -> Result<&Track> {
        self.tracks
            .iter()
            .find(|t| t.id == track_id)
            .ok_or(CoreError::TrackNotFound(track_id))
    }

    /// The first video track, which drives total duration and playback.
    pub fn video_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }

    pub fn find_clip(&self, clip_id: Uuid) -> Result<&Clip> {
        self.tracks
            .iter()
            .find_map(|t| t.clip(clip_id))
            .ok_or(CoreError::ClipNotFound(clip_id))
    }

    /// Length of the arrangement: the latest clip end on the video track.
    pub fn total_duration_us(&self) -> TimeUs {
        self.video_track().map(Track::end_us).unwrap_or(TimeUs::ZERO)
    }

    /// Place a clip at the end of a track's arrangement. The clip must satisfy
    /// the interval invariants; overlaps are allowed and left to conflict detection.
    pub fn add_clip(&mut self, track_id: Uuid, mut clip: Clip) -> Result<()> {
        clip.validate()?;
        if self.find_clip(clip.id).is_ok() {
            return Err(CoreError::InvalidOperation(format!(
                "clip {} is already on the timeline",
                clip.id
            )));
        }
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or(CoreError::TrackNotFound(track_id))?;

        clip.track_id = track_id;
        track.clips.push(clip);
        Ok(())
    }

    /// Detach a clip from its track. Returns the removed clip.
    pub fn remove_clip(&mut self, clip_id: Uuid) -> Result<Clip> {
        let (track_idx, clip_idx) = self
            .find_clip_location(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        Ok(self.tracks[track_idx].clips.remove(clip_idx))
    }

    /// Set both trim points of a clip.
    ///
    /// `new_in` is floored at 0 and `new_out` capped at the source length.
    /// If the result would be shorter than `min_duration`, the edge that moved
    /// stops at the boundary instead of failing. The clip's start stays put, so
    /// its end moves; neighbouring clips are never shifted.
    pub fn trim(
        &mut self,
        clip_id: Uuid,
        new_in: TimeUs,
        new_out: TimeUs,
        min_duration: TimeUs,
    ) -> Result<TrimOutcome> {
        let (track_idx, clip_idx) = self
            .find_clip_location(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;

        let clip = &self.tracks[track_idx].clips[clip_idx];
        let outcome = clamp_trim(clip, new_in, new_out, min_duration)?;

        let clip = &mut self.tracks[track_idx].clips[clip_idx];
        clip.source_in_us = outcome.source_in_us;
        clip.source_out_us = outcome.source_out_us;

        if outcome.clamped {
            tracing::debug!(
                clip = %clip_id,
                requested_in = new_in.0,
                requested_out = new_out.0,
                applied_in = outcome.source_in_us.0,
                applied_out = outcome.source_out_us.0,
                "Trim clamped"
            );
        }
        Ok(outcome)
    }

    /// Move only the in-point.
    pub fn trim_in(&mut self, clip_id: Uuid, new_in: TimeUs, min_duration: TimeUs) -> Result<TrimOutcome> {
        let out = self.find_clip(clip_id)?.source_out_us;
        self.trim(clip_id, new_in, out, min_duration)
    }

    /// Move only the out-point.
    pub fn trim_out(&mut self, clip_id: Uuid, new_out: TimeUs, min_duration: TimeUs) -> Result<TrimOutcome> {
        let source_in = self.find_clip(clip_id)?.source_in_us;
        self.trim(clip_id, source_in, new_out, min_duration)
    }

    /// Move `dragged_id` to the arrangement slot held by `target_id`, then lay
    /// the whole track out back to back from 0 in the new order.
    ///
    /// The slot is the target's index before the move. Dragging backwards lands
    /// the clip just before the target; dragging forwards lands it just after,
    /// so dragging A onto C in `[A, B, C]` gives `[B, C, A]`.
    pub fn reorder(&mut self, track_id: Uuid, dragged_id: Uuid, target_id: Uuid) -> Result<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or(CoreError::TrackNotFound(track_id))?;

        let from = track
            .clips
            .iter()
            .position(|c| c.id == dragged_id)
            .ok_or(CoreError::ClipNotFound(dragged_id))?;
        let to = track
            .clips
            .iter()
            .position(|c| c.id == target_id)
            .ok_or(CoreError::ClipNotFound(target_id))?;

        let clip = track.clips.remove(from);
        track.clips.insert(to.min(track.clips.len()), clip);
        lay_out_contiguous(track);

        tracing::debug!(track = %track_id, dragged = %dragged_id, from, to, "Track reordered");
        Ok(())
    }

    /// Overwrite a clip's start. Used by the overlap resolver and undo.
    pub(crate) fn set_clip_start(&mut self, clip_id: Uuid, start: TimeUs) -> Result<()> {
        let (track_idx, clip_idx) = self
            .find_clip_location(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        self.tracks[track_idx].clips[clip_idx].timeline_start_us = start;
        Ok(())
    }

    /// Restore saved trim points without clamping. Used by undo.
    pub(crate) fn set_trim_points(&mut self, clip_id: Uuid, source_in: TimeUs, source_out: TimeUs) -> Result<()> {
        let (track_idx, clip_idx) = self
            .find_clip_location(clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let clip = &mut self.tracks[track_idx].clips[clip_idx];
        clip.source_in_us = source_in;
        clip.source_out_us = source_out;
        Ok(())
    }

    /// Put a previously removed clip back at a given arrangement index.
    pub(crate) fn insert_clip_at(&mut self, track_id: Uuid, index: usize, clip: Clip) -> Result<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or(CoreError::TrackNotFound(track_id))?;
        let index = index.min(track.clips.len());
        track.clips.insert(index, clip);
        Ok(())
    }

    /// Swap a track's clip list wholesale, returning the old one.
    pub(crate) fn replace_clips(&mut self, track_id: Uuid, clips: Vec<Clip>) -> Result<Vec<Clip>> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or(CoreError::TrackNotFound(track_id))?;
        Ok(std::mem::replace(&mut track.clips, clips))
    }

    /// Find the (track_index, clip_index) for a given clip id.
    pub(crate) fn find_clip_location(&self, clip_id: Uuid) -> Option<(usize, usize)> {
        for (ti, track) in self.tracks.iter().enumerate() {
            for (ci, clip) in track.clips.iter().enumerate() {
                if clip.id == clip_id {
                    return Some((ti, ci));
                }
            }
        }
        None
    }
}

/// Start each clip where the previous one ends, beginning at 0.
fn lay_out_contiguous(track: &mut Track) {
    let mut cursor = TimeUs::ZERO;
    for clip in &mut track.clips {
        clip.timeline_start_us = cursor;
        cursor = cursor + clip.duration_us();
    }
}

fn clamp_trim(clip: &Clip, new_in: TimeUs, new_out: TimeUs, min_duration: TimeUs) -> Result<TrimOutcome> {
    if min_duration <= TimeUs::ZERO {
        return Err(CoreError::InvalidOperation(
            "minimum clip duration must be positive".into(),
        ));
    }
    if let Some(max) = clip.source_duration_us {
        if max < min_duration {
            return Err(CoreError::InvalidOperation(format!(
                "source media ({}) is shorter than the minimum clip duration ({})",
                max, min_duration
            )));
        }
    }

    let mut source_in = new_in.max(TimeUs::ZERO);
    let mut source_out = match clip.source_duration_us {
        Some(max) => new_out.min(max),
        None => new_out,
    };

    if source_out - source_in < min_duration {
        let in_moved = source_in != clip.source_in_us;
        let out_moved = source_out != clip.source_out_us;
        if in_moved && !out_moved {
            source_in = source_out - min_duration;
        } else {
            source_out = source_in + min_duration;
        }

        if let Some(max) = clip.source_duration_us {
            if source_out > max {
                source_out = max;
                source_in = max - min_duration;
            }
        }
        if source_in < TimeUs::ZERO {
            source_in = TimeUs::ZERO;
            source_out = min_duration;
        }
    }

    Ok(TrimOutcome {
        source_in_us: source_in,
        source_out_us: source_out,
        clamped: source_in != new_in || source_out != new_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: TimeUs = TimeUs(100_000);

    fn make_clip(track_id: Uuid, start_us: i64, duration_us: i64) -> (Uuid, Clip) {
        let clip = Clip::new(track_id, TimeUs(start_us), TimeUs(duration_us));
        (clip.id, clip)
    }

    fn make_test_timeline() -> (Timeline, Uuid, Uuid) {
        let mut tl = Timeline::new(Uuid::new_v4());
        let track_id = tl.add_track(TrackKind::Video);
        let (clip_id, clip) = make_clip(track_id, 0, 5_000_000);
        tl.add_clip(track_id, clip).unwrap();
        (tl, track_id, clip_id)
    }

    fn make_three_clip_track() -> (Timeline, Uuid, [Uuid; 3]) {
        let mut tl = Timeline::new(Uuid::new_v4());
        let track_id = tl.add_track(TrackKind::Video);
        let (a, clip_a) = make_clip(track_id, 0, 2_000_000);
        let (b, clip_b) = make_clip(track_id, 2_000_000, 3_000_000);
        let (c, clip_c) = make_clip(track_id, 5_000_000, 1_000_000);
        for clip in [clip_a, clip_b, clip_c] {
            tl.add_clip(track_id, clip).unwrap();
        }
        (tl, track_id, [a, b, c])
    }

    fn assert_contiguous(track: &Track) {
        let mut expected = TimeUs::ZERO;
        for clip in &track.clips {
            assert_eq!(clip.timeline_start_us, expected);
            expected = clip.timeline_end_us();
        }
    }

    // -----------------------------------------------------------------------
    // add_clip / remove_clip
    // -----------------------------------------------------------------------

    #[test]
    fn add_clip_allows_overlap() {
        let (mut tl, track_id, _) = make_test_timeline();
        let (_, clip) = make_clip(track_id, 2_000_000, 5_000_000);
        assert!(tl.add_clip(track_id, clip).is_ok());
        assert_eq!(tl.tracks[0].clips.len(), 2);
    }

    #[test]
    fn add_clip_rejects_invalid_interval() {
        let (mut tl, track_id, _) = make_test_timeline();
        let (_, mut clip) = make_clip(track_id, 0, 5_000_000);
        clip.source_in_us = TimeUs(5_000_000);
        assert!(matches!(tl.add_clip(track_id, clip), Err(CoreError::InvalidClip(_))));
        assert_eq!(tl.tracks[0].clips.len(), 1);
    }

    #[test]
    fn add_clip_to_nonexistent_track_fails() {
        let mut tl = Timeline::new(Uuid::new_v4());
        let fake_track = Uuid::new_v4();
        let (_, clip) = make_clip(fake_track, 0, 5_000_000);
        let result = tl.add_clip(fake_track, clip);
        assert!(matches!(result.unwrap_err(), CoreError::TrackNotFound(_)));
    }

    #[test]
    fn add_clip_twice_fails() {
        let (mut tl, track_id, clip_id) = make_test_timeline();
        let copy = tl.find_clip(clip_id).unwrap().clone();
        assert!(tl.add_clip(track_id, copy).is_err());
    }

    #[test]
    fn remove_clip_works() {
        let (mut tl, _, clip_id) = make_test_timeline();
        let removed = tl.remove_clip(clip_id).unwrap();
        assert_eq!(removed.id, clip_id);
        assert!(tl.tracks[0].clips.is_empty());
    }

    #[test]
    fn remove_clip_with_bad_id_fails() {
        let (mut tl, _, _) = make_test_timeline();
        let before = tl.clone();
        let result = tl.remove_clip(Uuid::new_v4());
        assert!(matches!(result.unwrap_err(), CoreError::ClipNotFound(_)));
        assert_eq!(tl, before);
    }

    // -----------------------------------------------------------------------
    // total duration
    // -----------------------------------------------------------------------

    #[test]
    fn total_duration_is_latest_video_end() {
        let (mut tl, _, _) = make_three_clip_track();
        assert_eq!(tl.total_duration_us(), TimeUs(6_000_000));

        let audio = tl.add_track(TrackKind::Audio);
        let (_, long_audio) = make_clip(audio, 0, 60_000_000);
        tl.add_clip(audio, long_audio).unwrap();
        assert_eq!(tl.total_duration_us(), TimeUs(6_000_000));
    }

    #[test]
    fn total_duration_without_video_is_zero() {
        let tl = Timeline::new(Uuid::new_v4());
        assert_eq!(tl.total_duration_us(), TimeUs::ZERO);
    }

    // -----------------------------------------------------------------------
    // trim
    // -----------------------------------------------------------------------

    #[test]
    fn trim_sets_duration_exactly() {
        let (mut tl, _, clip_id) = make_test_timeline();
        let outcome = tl
            .trim(clip_id, TimeUs(1_234_567), TimeUs(3_456_789), MIN)
            .unwrap();
        assert!(!outcome.clamped);

        let clip = tl.find_clip(clip_id).unwrap();
        assert_eq!(clip.duration_us(), TimeUs(3_456_789 - 1_234_567));
        assert_eq!(clip.timeline_start_us, TimeUs::ZERO);
        assert_eq!(clip.timeline_end_us(), TimeUs(3_456_789 - 1_234_567));
    }

    #[test]
    fn trim_does_not_shift_neighbours() {
        let (mut tl, _, [a, b, c]) = make_three_clip_track();
        tl.trim_out(a, TimeUs(1_000_000), MIN).unwrap();

        assert_eq!(tl.find_clip(b).unwrap().timeline_start_us, TimeUs(2_000_000));
        assert_eq!(tl.find_clip(c).unwrap().timeline_start_us, TimeUs(5_000_000));
        assert_eq!(tl.find_clip(a).unwrap().timeline_end_us(), TimeUs(1_000_000));
    }

    #[test]
    fn trim_in_past_out_stops_at_minimum() {
        let (mut tl, _, clip_id) = make_test_timeline();
        let outcome = tl.trim_in(clip_id, TimeUs(6_000_000), MIN).unwrap();

        assert!(outcome.clamped);
        assert_eq!(outcome.source_in_us, TimeUs(4_900_000));
        assert_eq!(outcome.source_out_us, TimeUs(5_000_000));
        assert_eq!(tl.find_clip(clip_id).unwrap().duration_us(), MIN);
    }

    #[test]
    fn trim_out_before_in_stops_at_minimum() {
        let (mut tl, _, clip_id) = make_test_timeline();
        tl.trim_in(clip_id, TimeUs(2_000_000), MIN).unwrap();
        let outcome = tl.trim_out(clip_id, TimeUs(1_000_000), MIN).unwrap();

        assert!(outcome.clamped);
        assert_eq!(outcome.source_in_us, TimeUs(2_000_000));
        assert_eq!(outcome.source_out_us, TimeUs(2_100_000));
    }

    #[test]
    fn trim_clamps_to_media_bounds() {
        let (mut tl, _, clip_id) = make_test_timeline();
        let outcome = tl
            .trim(clip_id, TimeUs(-1_000_000), TimeUs(9_000_000), MIN)
            .unwrap();

        assert!(outcome.clamped);
        assert_eq!(outcome.source_in_us, TimeUs::ZERO);
        assert_eq!(outcome.source_out_us, TimeUs(5_000_000));
    }

    #[test]
    fn trim_at_media_end_pulls_in_point_back() {
        let (mut tl, _, clip_id) = make_test_timeline();
        let outcome = tl
            .trim(clip_id, TimeUs(4_950_000), TimeUs(4_950_000), MIN)
            .unwrap();
        assert!(outcome.clamped);
        let clip = tl.find_clip(clip_id).unwrap();
        assert_eq!(clip.source_in_us, TimeUs(4_900_000));
        assert_eq!(clip.source_out_us, TimeUs(5_000_000));
    }

    #[test]
    fn trim_unknown_clip_leaves_model_unchanged() {
        let (mut tl, _, _) = make_test_timeline();
        let before = tl.clone();
        let result = tl.trim(Uuid::new_v4(), TimeUs::ZERO, TimeUs(1_000_000), MIN);
        assert!(matches!(result, Err(CoreError::ClipNotFound(_))));
        assert_eq!(tl, before);
    }

    #[test]
    fn trim_rejects_non_positive_minimum() {
        let (mut tl, _, clip_id) = make_test_timeline();
        assert!(tl.trim(clip_id, TimeUs::ZERO, TimeUs(1_000_000), TimeUs::ZERO).is_err());
    }

    #[test]
    fn trim_without_known_source_length_extends_freely() {
        let (mut tl, _, clip_id) = make_test_timeline();
        let (ti, ci) = tl.find_clip_location(clip_id).unwrap();
        tl.tracks[ti].clips[ci].source_duration_us = None;

        let outcome = tl.trim_out(clip_id, TimeUs(20_000_000), MIN).unwrap();
        assert!(!outcome.clamped);
        assert_eq!(tl.find_clip(clip_id).unwrap().duration_us(), TimeUs(20_000_000));
    }

    // -----------------------------------------------------------------------
    // reorder
    // -----------------------------------------------------------------------

    #[test]
    fn reorder_moves_last_to_first() {
        let (mut tl, track_id, [a, b, c]) = make_three_clip_track();
        tl.reorder(track_id, c, a).unwrap();

        let ids: Vec<Uuid> = tl.tracks[0].clips.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![c, a, b]);
        assert_contiguous(&tl.tracks[0]);
        assert_eq!(tl.find_clip(a).unwrap().timeline_start_us, TimeUs(1_000_000));
    }

    #[test]
    fn reorder_moves_first_to_target_slot() {
        let (mut tl, track_id, [a, b, c]) = make_three_clip_track();
        tl.reorder(track_id, a, c).unwrap();

        let ids: Vec<Uuid> = tl.tracks[0].clips.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b, c, a]);
        assert_contiguous(&tl.tracks[0]);
    }

    #[test]
    fn reorder_closes_gaps_and_overlaps() {
        let mut tl = Timeline::new(Uuid::new_v4());
        let track_id = tl.add_track(TrackKind::Video);
        let (a, clip_a) = make_clip(track_id, 10_000_000, 4_000_000);
        let (b, clip_b) = make_clip(track_id, 1_000_000, 2_000_000);
        let (c, clip_c) = make_clip(track_id, 2_000_000, 3_000_000);
        for clip in [clip_a, clip_b, clip_c] {
            tl.add_clip(track_id, clip).unwrap();
        }

        tl.reorder(track_id, b, b).unwrap();
        assert_contiguous(&tl.tracks[0]);
        tl.reorder(track_id, a, c).unwrap();
        assert_contiguous(&tl.tracks[0]);
        assert_eq!(tl.tracks[0].end_us(), TimeUs(9_000_000));
    }

    #[test]
    fn reorder_any_permutation_is_contiguous() {
        let (mut tl, track_id, ids) = make_three_clip_track();
        for &dragged in &ids {
            for &target in &ids {
                tl.reorder(track_id, dragged, target).unwrap();
                assert_contiguous(&tl.tracks[0]);
            }
        }
    }

    #[test]
    fn reorder_unknown_clip_leaves_model_unchanged() {
        let (mut tl, track_id, [a, _, _]) = make_three_clip_track();
        let before = tl.clone();

        let result = tl.reorder(track_id, a, Uuid::new_v4());
        assert!(matches!(result, Err(CoreError::ClipNotFound(_))));
        assert_eq!(tl, before);

        let result = tl.reorder(Uuid::new_v4(), a, a);
        assert!(matches!(result, Err(CoreError::TrackNotFound(_))));
        assert_eq!(tl, before);
    }
}
