//! Port interfaces for the sync engine
//!
//! These traits define the boundary between the engine and the storage
//! layer. Implementations must enforce uniqueness of
//! `(calendar_id, provider_event_id)` so derived writes stay idempotent
//! even under concurrent callers.

use async_trait::async_trait;
use kronos_domain::{
    Calendar, CalendarId, CalendarPatch, Event, EventId, EventPatch, NewCalendar, NewEvent,
    Result, UserId,
};

/// Outcome of an idempotent batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchInsertOutcome {
    /// Rows actually written.
    pub inserted: u64,
    /// Rows skipped because their `(calendar_id, provider_event_id)` pair
    /// already existed.
    pub skipped: u64,
}

/// Trait for reading and writing calendar records.
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    /// The user's master calendar, if one exists.
    async fn find_master(&self, user_id: UserId) -> Result<Option<Calendar>>;

    /// Active, non-master calendars for the user.
    async fn find_active_sources(&self, user_id: UserId) -> Result<Vec<Calendar>>;

    /// Every calendar belonging to the user, regardless of flags.
    async fn find_all_for_user(&self, user_id: UserId) -> Result<Vec<Calendar>>;

    async fn find_by_id(&self, calendar_id: CalendarId) -> Result<Option<Calendar>>;

    /// Create a calendar. A second master for the same user must fail with
    /// `KronosError::Conflict`.
    async fn create(&self, calendar: NewCalendar) -> Result<Calendar>;

    /// Apply a partial update.
    async fn update(&self, calendar_id: CalendarId, patch: CalendarPatch) -> Result<Calendar>;

    /// Soft-removal used in normal operation.
    async fn deactivate(&self, calendar_id: CalendarId) -> Result<()>;

    /// Hard delete. Removes the calendar's events as well.
    async fn delete(&self, calendar_id: CalendarId) -> Result<()>;
}

/// Trait for reading and writing event records.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn events_for_calendar(&self, calendar_id: CalendarId) -> Result<Vec<Event>>;

    async fn events_for_calendars(&self, calendar_ids: &[CalendarId]) -> Result<Vec<Event>>;

    async fn count_for_calendar(&self, calendar_id: CalendarId) -> Result<u64>;

    /// Look up an event by its idempotency key.
    async fn find_by_provider_key(
        &self,
        calendar_id: CalendarId,
        provider_event_id: &str,
    ) -> Result<Option<Event>>;

    /// Insert a single event. Fails with `KronosError::Conflict` when the
    /// `(calendar_id, provider_event_id)` pair already exists and with
    /// `KronosError::InvalidInput` for degenerate time ranges.
    async fn create(&self, event: NewEvent) -> Result<Event>;

    /// Apply a partial update.
    async fn update(&self, event_id: EventId, patch: EventPatch) -> Result<Event>;

    async fn delete(&self, event_id: EventId) -> Result<()>;

    /// Insert many events in one transaction, silently skipping rows whose
    /// idempotency key already exists.
    async fn insert_batch(&self, events: Vec<NewEvent>) -> Result<BatchInsertOutcome>;

    /// Delete every event on the given calendars whose `provider_event_id`
    /// starts with `prefix`. Returns the number of rows removed.
    async fn delete_by_key_prefix(
        &self,
        calendar_ids: &[CalendarId],
        prefix: &str,
    ) -> Result<u64>;
}
