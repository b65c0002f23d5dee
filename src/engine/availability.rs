use crate::model::*;

// ── Free-time algorithms ──────────────────────────────────────────

/// Merge sorted overlapping/adjacent slots into disjoint slots.
pub fn merge_overlapping(sorted: &[TimeSlot]) -> Vec<TimeSlot> {
    let mut merged: Vec<TimeSlot> = Vec::new();
    for &slot in sorted {
        if let Some(last) = merged.last_mut()
            && slot.start <= last.end
        {
            last.end = last.end.max(slot.end);
            continue;
        }
        merged.push(slot);
    }
    merged
}

/// `base` minus `to_remove`; both sorted by start, `to_remove` disjoint.
pub fn subtract_intervals(base: &[TimeSlot], to_remove: &[TimeSlot]) -> Vec<TimeSlot> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(TimeSlot::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(TimeSlot::new(current_start, current_end));
        }
    }

    result
}

/// Maximal free gaps of `rs` inside `window` that are at least `min_duration` long.
pub fn free_slots(rs: &ResourceState, window: &TimeSlot, min_duration: Minute) -> Vec<TimeSlot> {
    let mut busy: Vec<TimeSlot> = rs
        .overlapping(window)
        .map(|r| r.slot)
        .collect();
    busy.sort_by_key(|s| s.start);
    let busy = merge_overlapping(&busy);

    let mut free = subtract_intervals(&[*window], &busy);
    free.retain(|s| s.duration() >= min_duration.max(1));
    free
}

/// The bounded shift heuristic: `preferred` moved earlier then later by
/// `offset`, each `duration` long, kept only if inside the axis and free.
pub fn alternative_slots(
    rs: &ResourceState,
    preferred: &TimeSlot,
    duration: Minute,
    offset: Minute,
    axis_len: Minute,
) -> Vec<TimeSlot> {
    if duration == 0 || offset == 0 {
        return Vec::new();
    }
    let earlier = preferred.start.checked_sub(offset);
    let later = preferred.start.checked_add(offset);

    [earlier, later]
        .into_iter()
        .flatten()
        .filter_map(|start| {
            let end = start.checked_add(duration)?;
            (end <= axis_len).then(|| TimeSlot::new(start, end))
        })
        .filter(|slot| !rs.has_conflict(slot))
        .collect()
}
