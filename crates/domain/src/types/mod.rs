//! Domain types and models

pub mod calendar;
pub mod event;
pub mod sync;

// Re-export record types for convenience
pub use calendar::{Calendar, CalendarPatch, CalendarProvider, NewCalendar};
pub use event::{DateRange, Event, EventPatch, EventStatus, EventVisibility, NewEvent};
pub use sync::{
    BusyBlockReport, CalendarFailure, ClearBusyBlocksReport, Conflict, MasterCalendarStatus,
    MirrorReport, SourceCalendarSummary, SyncStatusReport, SyncSummary,
};

/// Opaque owner identity. Assigned by the out-of-scope account system.
pub type UserId = i64;

/// Store-assigned calendar identity.
pub type CalendarId = i64;

/// Store-assigned event identity.
pub type EventId = i64;
