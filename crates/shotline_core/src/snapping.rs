use crate::types::*;

/// Find the nearest snap point within the threshold.
/// Returns the snapped position if within threshold, otherwise the original position.
pub fn find_snap_point(position_us: TimeUs, snap_points: &[TimeUs], threshold_us: TimeUs) -> TimeUs {
    snap_points
        .iter()
        .map(|&point| (point, (position_us.0 - point.0).abs()))
        .filter(|&(_, dist)| dist <= threshold_us.0)
        .min_by_key(|&(_, dist)| dist)
        .map(|(point, _)| point)
        .unwrap_or(position_us)
}

/// Collect snap points from a timeline: time 0, every clip edge and every
/// transition position.
pub fn collect_snap_points(
    timeline: &Timeline,
    transitions: &[Transition],
    exclude_clip_id: Option<uuid::Uuid>,
) -> Vec<TimeUs> {
    let mut points = vec![TimeUs::ZERO];

    for track in &timeline.tracks {
        for clip in &track.clips {
            if Some(clip.id) == exclude_clip_id {
                continue;
            }
            points.push(clip.timeline_start_us);
            points.push(clip.timeline_end_us());
        }
    }

    points.extend(transitions.iter().map(|t| t.position_us));

    points.sort();
    points.dedup();
    points
}
