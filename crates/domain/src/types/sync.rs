//! Result objects returned by the sync engine and the status reporter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CalendarId, CalendarProvider, EventId, UserId};

/// Outcome of a mirror-to-master run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorReport {
    /// Mirrors newly inserted by this run. Zero on a repeat run against
    /// unchanged source data.
    pub mirrored_count: u64,
    pub source_calendar_count: u64,
}

/// One target calendar that could not be processed during busy-block
/// propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFailure {
    pub calendar_id: CalendarId,
    pub error: String,
}

/// Outcome of a busy-block propagation run.
///
/// A failed target calendar never aborts the others; failures ride along
/// with the successfully-created count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyBlockReport {
    pub placeholders_created: u64,
    pub failed_calendars: Vec<CalendarFailure>,
}

/// Outcome of a combined sync run.
///
/// The busy-block step reports independently of the mirror step: a fatal
/// propagation error lands in `busy_block_error` without failing the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub mirrored_count: u64,
    pub source_calendar_count: u64,
    pub total_master_events: u64,
    pub busy_blocks: Option<BusyBlockReport>,
    pub busy_block_error: Option<String>,
}

/// Outcome of clearing busy-block placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearBusyBlocksReport {
    pub deleted_count: u64,
}

/// Master-calendar portion of a sync status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterCalendarStatus {
    pub exists: bool,
    pub calendar_id: Option<CalendarId>,
    pub event_count: u64,
}

/// One source calendar in a sync status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCalendarSummary {
    pub id: CalendarId,
    pub name: String,
    pub provider: CalendarProvider,
}

/// Read-only aggregation over the store for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub user_id: UserId,
    pub master: MasterCalendarStatus,
    pub source_calendars: Vec<SourceCalendarSummary>,
    pub source_event_count: u64,
}

/// An unordered pair of events whose time ranges overlap, annotated with
/// the overlapping interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub event_a: EventId,
    pub event_b: EventId,
    pub overlap_start: DateTime<Utc>,
    pub overlap_end: DateTime<Utc>,
}

impl Conflict {
    /// Build a conflict with the pair normalized so `event_a < event_b`.
    pub fn new(
        first: EventId,
        second: EventId,
        overlap_start: DateTime<Utc>,
        overlap_end: DateTime<Utc>,
    ) -> Self {
        let (event_a, event_b) = if first <= second { (first, second) } else { (second, first) };
        Self { event_a, event_b, overlap_start, overlap_end }
    }

    /// True when the given event participates in this conflict.
    pub fn involves(&self, event_id: EventId) -> bool {
        self.event_a == event_id || self.event_b == event_id
    }
}
