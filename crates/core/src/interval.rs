//! Pure interval arithmetic over event time ranges.
//!
//! All ranges are half-open `[start, end)`. The overlap predicate here is
//! the single one used by mirroring, busy-block derivation and conflict
//! detection.

use chrono::{DateTime, Duration, Utc};

/// Strict half-open overlap test: touching endpoints do not overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// True when `[inner_start, inner_end)` lies entirely within
/// `[outer_start, outer_end)`.
pub fn contains(
    outer_start: DateTime<Utc>,
    outer_end: DateTime<Utc>,
    inner_start: DateTime<Utc>,
    inner_end: DateTime<Utc>,
) -> bool {
    inner_start >= outer_start && inner_end <= outer_end
}

/// Length of the range. Negative for inverted input; callers reject those
/// at the store boundary.
pub fn duration(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    end - start
}

/// The intersection of two ranges, when they overlap.
pub fn overlap_window(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if !overlaps(a_start, a_end, b_start, b_end) {
        return None;
    }
    Some((a_start.max(b_start), a_end.min(b_end)))
}
