//! Structural analysis of a track: overlaps, gaps, and clips that play out of
//! the authored shot order. Detection is a pure function of the track; only
//! [`auto_fix`] mutates anything, and only when asked.

use crate::error::{CoreError, Result};
use crate::types::*;
use std::collections::HashMap;
use uuid::Uuid;

/// Authored position of each clip, keyed by clip id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalOrder {
    sequence: HashMap<Uuid, u32>,
}

impl CanonicalOrder {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Uuid, u32)>) -> Self {
        Self {
            sequence: pairs.into_iter().collect(),
        }
    }

    /// Give every generated clip the sequence number of the shot it belongs to.
    /// Clips whose shot is unknown are left out and never reported as misordered.
    pub fn from_shots(shots: &[Shot], clips: &[ShotClip]) -> Self {
        let shot_numbers: HashMap<Uuid, u32> =
            shots.iter().map(|s| (s.id, s.sequence_number)).collect();
        Self::from_pairs(
            clips
                .iter()
                .filter_map(|c| shot_numbers.get(&c.shot_id).map(|&n| (c.id, n))),
        )
    }

    pub fn sequence_of(&self, clip_id: Uuid) -> Option<u32> {
        self.sequence.get(&clip_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Report every overlap, gap and order mismatch between start-adjacent clips.
///
/// Clips are sorted by start time first, whatever the arrangement order. The
/// three passes run independently, so one pair may show up more than once.
pub fn detect_conflicts(
    track: &Track,
    canonical: Option<&CanonicalOrder>,
    gap_threshold: TimeUs,
) -> Vec<Conflict> {
    let sorted = track.clips_by_start();
    let mut conflicts = Vec::new();
    conflicts.extend(detect_overlaps(track.id, &sorted));
    conflicts.extend(detect_gaps(track.id, &sorted, gap_threshold));
    if let Some(order) = canonical {
        conflicts.extend(detect_order_mismatches(track.id, &sorted, order));
    }
    conflicts
}

/// Run detection over every track and concatenate the results in track order.
pub fn detect_timeline_conflicts(
    timeline: &Timeline,
    canonical: Option<&CanonicalOrder>,
    gap_threshold: TimeUs,
) -> Vec<Conflict> {
    timeline
        .tracks
        .iter()
        .flat_map(|t| detect_conflicts(t, canonical, gap_threshold))
        .collect()
}

fn detect_overlaps(track_id: Uuid, sorted: &[&Clip]) -> Vec<Conflict> {
    sorted
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let a_end = a.timeline_end_us();
            if a_end <= b.timeline_start_us {
                return None;
            }
            let amount = a_end - b.timeline_start_us;
            Some(Conflict {
                kind: ConflictKind::Overlap,
                severity: Severity::Error,
                track_id,
                message: format!(
                    "{} overlaps {} by {:.2}s",
                    a.display_name(),
                    b.display_name(),
                    amount.as_seconds()
                ),
                clip_ids: vec![a.id, b.id],
                amount_us: Some(amount),
                suggested_fix: Some(format!(
                    "Move {} to {:.1}s",
                    b.display_name(),
                    a_end.as_seconds()
                )),
            })
        })
        .collect()
}

fn detect_gaps(track_id: Uuid, sorted: &[&Clip], threshold: TimeUs) -> Vec<Conflict> {
    sorted
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let gap = b.timeline_start_us - a.timeline_end_us();
            if gap <= threshold {
                return None;
            }
            Some(Conflict {
                kind: ConflictKind::Gap,
                severity: Severity::Info,
                track_id,
                message: format!(
                    "{:.2}s gap between {} and {}",
                    gap.as_seconds(),
                    a.display_name(),
                    b.display_name()
                ),
                clip_ids: vec![a.id, b.id],
                amount_us: Some(gap),
                suggested_fix: Some(format!(
                    "Move {} to {:.1}s",
                    b.display_name(),
                    a.timeline_end_us().as_seconds()
                )),
            })
        })
        .collect()
}

fn detect_order_mismatches(track_id: Uuid, sorted: &[&Clip], order: &CanonicalOrder) -> Vec<Conflict> {
    sorted
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let a_seq = order.sequence_of(a.id)?;
            let b_seq = order.sequence_of(b.id)?;
            if a_seq <= b_seq {
                return None;
            }
            Some(Conflict {
                kind: ConflictKind::Order,
                severity: Severity::Warning,
                track_id,
                message: format!(
                    "{} (shot {}) plays before {} (shot {})",
                    a.display_name(),
                    a_seq,
                    b.display_name(),
                    b_seq
                ),
                clip_ids: vec![a.id, b.id],
                amount_us: None,
                suggested_fix: Some(format!(
                    "Drag {} ahead of {}",
                    b.display_name(),
                    a.display_name()
                )),
            })
        })
        .collect()
}

/// What an automatic fix changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixOutcome {
    pub clip_id: Uuid,
    pub old_start_us: TimeUs,
    pub new_start_us: TimeUs,
}

/// Resolve an overlap by starting the later clip exactly where the earlier one
/// ends. No other clip moves, so the shifted clip may now overlap the next one;
/// only a fresh detection pass will show that.
pub fn auto_fix(timeline: &mut Timeline, conflict: &Conflict) -> Result<FixOutcome> {
    if conflict.kind != ConflictKind::Overlap {
        return Err(CoreError::NotAutoFixable(conflict.kind));
    }
    let (first_id, second_id) = match conflict.clip_ids.as_slice() {
        [first, second] => (*first, *second),
        _ => {
            return Err(CoreError::InvalidOperation(
                "overlap conflict must name two clips".into(),
            ))
        }
    };

    let track = timeline.track(conflict.track_id)?;
    let first = track
        .clip(first_id)
        .ok_or(CoreError::ClipNotFound(first_id))?;
    let second = track
        .clip(second_id)
        .ok_or(CoreError::ClipNotFound(second_id))?;

    let outcome = FixOutcome {
        clip_id: second_id,
        old_start_us: second.timeline_start_us,
        new_start_us: first.timeline_end_us(),
    };
    timeline.set_clip_start(second_id, outcome.new_start_us)?;

    tracing::debug!(
        clip = %second_id,
        from = outcome.old_start_us.0,
        to = outcome.new_start_us.0,
        "Overlap resolved"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAP: TimeUs = TimeUs(500_000);

    fn track_with(clips: &[(&str, i64, i64)]) -> (Timeline, Uuid, Vec<Uuid>) {
        let mut tl = Timeline::new(Uuid::new_v4());
        let track_id = tl.add_track(TrackKind::Video);
        let mut ids = Vec::new();
        for &(label, start, duration) in clips {
            let clip = Clip::new(track_id, TimeUs(start), TimeUs(duration)).with_label(label);
            ids.push(clip.id);
            tl.add_clip(track_id, clip).unwrap();
        }
        (tl, track_id, ids)
    }

    fn of_kind(conflicts: &[Conflict], kind: ConflictKind) -> Vec<&Conflict> {
        conflicts.iter().filter(|c| c.kind == kind).collect()
    }

    #[test]
    fn overlap_reported_with_amount_and_fix() {
        let (tl, _, ids) = track_with(&[("A", 0, 5_000_000), ("B", 3_000_000, 4_000_000)]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);

        assert_eq!(conflicts.len(), 1);
        let overlap = &conflicts[0];
        assert_eq!(overlap.kind, ConflictKind::Overlap);
        assert_eq!(overlap.severity, Severity::Error);
        assert_eq!(overlap.amount_us, Some(TimeUs(2_000_000)));
        assert_eq!(overlap.clip_ids, ids);
        assert_eq!(overlap.suggested_fix.as_deref(), Some("Move B to 5.0s"));
    }

    #[test]
    fn gap_reported_above_threshold() {
        let (tl, _, _) = track_with(&[("A", 0, 5_000_000), ("B", 7_000_000, 4_000_000)]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Gap);
        assert_eq!(conflicts[0].severity, Severity::Info);
        assert_eq!(conflicts[0].amount_us, Some(TimeUs(2_000_000)));
    }

    #[test]
    fn gap_at_threshold_is_ignored() {
        let (tl, _, _) = track_with(&[("A", 0, 5_000_000), ("B", 5_500_000, 1_000_000)]);
        assert!(detect_conflicts(&tl.tracks[0], None, GAP).is_empty());
    }

    #[test]
    fn adjacent_clips_are_clean() {
        let (tl, _, _) = track_with(&[("A", 0, 5_000_000), ("B", 5_000_000, 1_000_000)]);
        assert!(detect_conflicts(&tl.tracks[0], None, GAP).is_empty());
    }

    #[test]
    fn detection_sorts_by_start_time() {
        // Arrangement order is B, A but A starts first.
        let (tl, _, ids) = track_with(&[("B", 3_000_000, 4_000_000), ("A", 0, 5_000_000)]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].clip_ids, vec![ids[1], ids[0]]);
    }

    #[test]
    fn order_mismatch_needs_canonical_sequence() {
        let (tl, _, ids) = track_with(&[("A", 0, 1_000_000), ("B", 1_000_000, 1_000_000)]);
        assert!(detect_conflicts(&tl.tracks[0], None, GAP).is_empty());

        let order = CanonicalOrder::from_pairs([(ids[0], 2), (ids[1], 1)]);
        let conflicts = detect_conflicts(&tl.tracks[0], Some(&order), GAP);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Order);
        assert_eq!(conflicts[0].severity, Severity::Warning);
        assert_eq!(conflicts[0].clip_ids, ids);
    }

    #[test]
    fn equal_sequence_numbers_are_in_order() {
        let (tl, _, ids) = track_with(&[("A", 0, 1_000_000), ("B", 1_000_000, 1_000_000)]);
        let order = CanonicalOrder::from_pairs([(ids[0], 1), (ids[1], 1)]);
        assert!(detect_conflicts(&tl.tracks[0], Some(&order), GAP).is_empty());
    }

    #[test]
    fn unmapped_clips_are_skipped_by_order_pass() {
        let (tl, _, ids) = track_with(&[("A", 0, 1_000_000), ("B", 1_000_000, 1_000_000)]);
        let order = CanonicalOrder::from_pairs([(ids[0], 5)]);
        assert!(detect_conflicts(&tl.tracks[0], Some(&order), GAP).is_empty());
    }

    #[test]
    fn one_pair_can_overlap_and_be_misordered() {
        let (tl, _, ids) = track_with(&[("A", 0, 5_000_000), ("B", 3_000_000, 4_000_000)]);
        let order = CanonicalOrder::from_pairs([(ids[0], 2), (ids[1], 1)]);
        let conflicts = detect_conflicts(&tl.tracks[0], Some(&order), GAP);

        assert_eq!(conflicts.len(), 2);
        assert_eq!(of_kind(&conflicts, ConflictKind::Overlap).len(), 1);
        assert_eq!(of_kind(&conflicts, ConflictKind::Order).len(), 1);
    }

    #[test]
    fn detection_is_idempotent() {
        let (tl, _, ids) = track_with(&[
            ("A", 0, 5_000_000),
            ("B", 3_000_000, 4_000_000),
            ("C", 10_000_000, 1_000_000),
        ]);
        let order = CanonicalOrder::from_pairs([(ids[0], 3), (ids[1], 1), (ids[2], 2)]);
        let first = detect_conflicts(&tl.tracks[0], Some(&order), GAP);
        let second = detect_conflicts(&tl.tracks[0], Some(&order), GAP);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn canonical_order_from_shots() {
        let shot_1 = Shot {
            id: Uuid::new_v4(),
            sequence_number: 1,
            previous_shot_id: None,
            transition_type: None,
            use_last_frame_as_first: false,
        };
        let shot_2 = Shot {
            id: Uuid::new_v4(),
            sequence_number: 2,
            previous_shot_id: Some(shot_1.id),
            transition_type: Some(TransitionKind::Fade),
            use_last_frame_as_first: true,
        };
        let clip_a = ShotClip {
            id: Uuid::new_v4(),
            shot_id: shot_2.id,
            duration_us: TimeUs(1_000_000),
            selected: true,
        };
        let orphan = ShotClip {
            id: Uuid::new_v4(),
            shot_id: Uuid::new_v4(),
            duration_us: TimeUs(1_000_000),
            selected: true,
        };

        let order = CanonicalOrder::from_shots(&[shot_1, shot_2], &[clip_a.clone(), orphan.clone()]);
        assert_eq!(order.sequence_of(clip_a.id), Some(2));
        assert_eq!(order.sequence_of(orphan.id), None);
        assert!(!order.is_empty());
    }

    #[test]
    fn auto_fix_moves_second_clip_to_first_end() {
        let (mut tl, _, ids) = track_with(&[("A", 0, 5_000_000), ("B", 3_000_000, 4_000_000)]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);

        let outcome = auto_fix(&mut tl, &conflicts[0]).unwrap();
        assert_eq!(outcome.clip_id, ids[1]);
        assert_eq!(outcome.old_start_us, TimeUs(3_000_000));
        assert_eq!(tl.find_clip(ids[1]).unwrap().timeline_start_us, TimeUs(5_000_000));

        let after = detect_conflicts(&tl.tracks[0], None, GAP);
        assert!(of_kind(&after, ConflictKind::Overlap).is_empty());
    }

    #[test]
    fn auto_fix_can_cascade_into_next_clip() {
        let (mut tl, _, ids) = track_with(&[
            ("A", 0, 5_000_000),
            ("B", 3_000_000, 4_000_000),
            ("C", 7_500_000, 2_000_000),
        ]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);
        assert_eq!(of_kind(&conflicts, ConflictKind::Overlap).len(), 1);

        auto_fix(&mut tl, &conflicts[0]).unwrap();
        assert_eq!(tl.find_clip(ids[2]).unwrap().timeline_start_us, TimeUs(7_500_000));

        let after = detect_conflicts(&tl.tracks[0], None, GAP);
        let overlaps = of_kind(&after, ConflictKind::Overlap);
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].clip_ids, vec![ids[1], ids[2]]);
        assert_eq!(overlaps[0].amount_us, Some(TimeUs(1_500_000)));
    }

    #[test]
    fn auto_fix_rejects_gap_and_order() {
        let (mut tl, _, _) = track_with(&[("A", 0, 5_000_000), ("B", 7_000_000, 4_000_000)]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);
        let before = tl.clone();

        let result = auto_fix(&mut tl, &conflicts[0]);
        assert!(matches!(result, Err(CoreError::NotAutoFixable(ConflictKind::Gap))));
        assert_eq!(tl, before);
    }

    #[test]
    fn auto_fix_with_stale_conflict_leaves_model_unchanged() {
        let (mut tl, _, ids) = track_with(&[("A", 0, 5_000_000), ("B", 3_000_000, 4_000_000)]);
        let conflicts = detect_conflicts(&tl.tracks[0], None, GAP);
        tl.remove_clip(ids[0]).unwrap();
        let before = tl.clone();

        let result = auto_fix(&mut tl, &conflicts[0]);
        assert!(matches!(result, Err(CoreError::ClipNotFound(_))));
        assert_eq!(tl, before);
    }

    #[test]
    fn timeline_detection_covers_every_track() {
        let (mut tl, _, _) = track_with(&[("A", 0, 5_000_000), ("B", 3_000_000, 4_000_000)]);
        let audio = tl.add_track(TrackKind::Audio);
        tl.add_clip(audio, Clip::new(audio, TimeUs::ZERO, TimeUs(1_000_000)))
            .unwrap();
        tl.add_clip(audio, Clip::new(audio, TimeUs(3_000_000), TimeUs(1_000_000)))
            .unwrap();

        let conflicts = detect_timeline_conflicts(&tl, None, GAP);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[1].track_id, audio);
        assert_eq!(conflicts[1].kind, ConflictKind::Gap);
    }
}
