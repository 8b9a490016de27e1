//! Conflict detection over an arbitrary event set.
//!
//! The detector is independent of the sync engine: callers hand it whatever
//! events they care about (organic, derived, or both) and get back the
//! subset that overlaps in time.

use std::collections::HashSet;

use kronos_domain::{Conflict, DateRange, Event, EventId};

use crate::interval;

/// Events participating in at least one overlapping pair, each included
/// exactly once, ordered by start time.
///
/// The input is optionally narrowed by `range` first. Pairwise testing
/// walks the start-sorted set and stops scanning a candidate's successors
/// once one starts at or after its end; sorted order makes the remainder
/// non-overlapping, so the flagged set is identical to the full quadratic
/// sweep, including the strict half-open tie-break.
pub fn find_conflicts(events: &[Event], range: Option<&DateRange>) -> Vec<Event> {
    let sorted = filtered_and_sorted(events, range);
    let mut conflicted: HashSet<EventId> = HashSet::new();

    for (i, event) in sorted.iter().enumerate() {
        for other in &sorted[i + 1..] {
            if other.start_time >= event.end_time {
                break;
            }
            if interval::overlaps(
                event.start_time,
                event.end_time,
                other.start_time,
                other.end_time,
            ) {
                conflicted.insert(event.id);
                conflicted.insert(other.id);
            }
        }
    }

    sorted.into_iter().filter(|event| conflicted.contains(&event.id)).cloned().collect()
}

/// Overlapping pairs annotated with the overlap window, in start order of
/// the earlier event of each pair.
pub fn find_conflict_pairs(events: &[Event], range: Option<&DateRange>) -> Vec<Conflict> {
    let sorted = filtered_and_sorted(events, range);
    let mut pairs = Vec::new();

    for (i, event) in sorted.iter().enumerate() {
        for other in &sorted[i + 1..] {
            if other.start_time >= event.end_time {
                break;
            }
            if let Some((overlap_start, overlap_end)) = interval::overlap_window(
                event.start_time,
                event.end_time,
                other.start_time,
                other.end_time,
            ) {
                pairs.push(Conflict::new(event.id, other.id, overlap_start, overlap_end));
            }
        }
    }

    pairs
}

fn filtered_and_sorted<'a>(events: &'a [Event], range: Option<&DateRange>) -> Vec<&'a Event> {
    let mut kept: Vec<&Event> = events
        .iter()
        .filter(|event| range.map_or(true, |r| r.contains(event)))
        .collect();
    kept.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
    kept
}
