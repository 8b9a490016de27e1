//! In-memory implementations of the sync engine's store ports.
//!
//! One `MemoryStore` backs both repository traits so calendar deletion can
//! cascade to events, mirroring the real store. Enforces the same
//! uniqueness rules as the SQLite schema: one master per user, unique
//! `(calendar_id, provider_event_id)`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kronos_core::sync::ports::{BatchInsertOutcome, CalendarRepository, EventRepository};
use kronos_domain::{
    Calendar, CalendarId, CalendarPatch, CalendarProvider, Event, EventId, EventPatch,
    EventStatus, EventVisibility, KronosError, NewCalendar, NewEvent, Result, UserId,
};

#[derive(Default)]
struct State {
    calendars: Vec<Calendar>,
    events: Vec<Event>,
    next_calendar_id: CalendarId,
    next_event_id: EventId,
    /// Calendars whose event inserts fail, for partial-failure tests.
    failing_calendars: HashSet<CalendarId>,
}

/// In-memory store implementing both repository ports.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let state =
            State { next_calendar_id: 1, next_event_id: 1, ..State::default() };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Seed a source calendar for the given user.
    pub fn add_source_calendar(&self, user_id: UserId, name: &str) -> Calendar {
        self.add_calendar(user_id, name, false, true)
    }

    /// Seed a calendar with explicit flags.
    pub fn add_calendar(
        &self,
        user_id: UserId,
        name: &str,
        is_master: bool,
        is_active: bool,
    ) -> Calendar {
        let mut state = self.state.lock().unwrap();
        let id = state.next_calendar_id;
        state.next_calendar_id += 1;
        let now = Utc::now();
        let calendar = Calendar {
            id,
            user_id,
            provider: CalendarProvider::Google,
            provider_calendar_id: format!("cal-{id}"),
            name: name.to_string(),
            description: None,
            is_master,
            is_active,
            created_at: now,
            updated_at: now,
        };
        state.calendars.push(calendar.clone());
        calendar
    }

    /// Seed an organic event.
    pub fn add_event(
        &self,
        calendar_id: CalendarId,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Event {
        let mut state = self.state.lock().unwrap();
        let id = state.next_event_id;
        state.next_event_id += 1;
        let now = Utc::now();
        let event = Event {
            id,
            calendar_id,
            provider_event_id: format!("organic-{id}"),
            title: title.to_string(),
            description: None,
            location: None,
            start_time: start,
            end_time: end,
            timezone: "UTC".to_string(),
            is_all_day: false,
            status: EventStatus::Confirmed,
            visibility: EventVisibility::Default,
            created_at: now,
            updated_at: now,
        };
        state.events.push(event.clone());
        event
    }

    /// Make every event insert targeting `calendar_id` fail.
    pub fn fail_inserts_for(&self, calendar_id: CalendarId) {
        self.state.lock().unwrap().failing_calendars.insert(calendar_id);
    }

    /// Snapshot of the events currently on one calendar.
    pub fn events_on(&self, calendar_id: CalendarId) -> Vec<Event> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.calendar_id == calendar_id)
            .cloned()
            .collect()
    }
}

fn insert_event(state: &mut State, draft: &NewEvent) -> Result<Event> {
    draft.validate()?;
    let exists = state.events.iter().any(|e| {
        e.calendar_id == draft.calendar_id && e.provider_event_id == draft.provider_event_id
    });
    if exists {
        return Err(KronosError::Conflict(format!(
            "event with key {} already exists on calendar {}",
            draft.provider_event_id, draft.calendar_id
        )));
    }
    let id = state.next_event_id;
    state.next_event_id += 1;
    let now = Utc::now();
    let event = Event {
        id,
        calendar_id: draft.calendar_id,
        provider_event_id: draft.provider_event_id.clone(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        location: draft.location.clone(),
        start_time: draft.start_time,
        end_time: draft.end_time,
        timezone: draft.timezone.clone(),
        is_all_day: draft.is_all_day,
        status: draft.status,
        visibility: draft.visibility,
        created_at: now,
        updated_at: now,
    };
    state.events.push(event.clone());
    Ok(event)
}

#[async_trait]
impl CalendarRepository for MemoryStore {
    async fn find_master(&self, user_id: UserId) -> Result<Option<Calendar>> {
        let state = self.state.lock().unwrap();
        Ok(state.calendars.iter().find(|c| c.user_id == user_id && c.is_master).cloned())
    }

    async fn find_active_sources(&self, user_id: UserId) -> Result<Vec<Calendar>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .calendars
            .iter()
            .filter(|c| c.user_id == user_id && c.is_source())
            .cloned()
            .collect())
    }

    async fn find_all_for_user(&self, user_id: UserId) -> Result<Vec<Calendar>> {
        let state = self.state.lock().unwrap();
        Ok(state.calendars.iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn find_by_id(&self, calendar_id: CalendarId) -> Result<Option<Calendar>> {
        let state = self.state.lock().unwrap();
        Ok(state.calendars.iter().find(|c| c.id == calendar_id).cloned())
    }

    async fn create(&self, calendar: NewCalendar) -> Result<Calendar> {
        let mut state = self.state.lock().unwrap();
        if calendar.is_master
            && state.calendars.iter().any(|c| c.user_id == calendar.user_id && c.is_master)
        {
            return Err(KronosError::Conflict(format!(
                "user {} already has a master calendar",
                calendar.user_id
            )));
        }
        let id = state.next_calendar_id;
        state.next_calendar_id += 1;
        let now = Utc::now();
        let stored = Calendar {
            id,
            user_id: calendar.user_id,
            provider: calendar.provider,
            provider_calendar_id: calendar.provider_calendar_id,
            name: calendar.name,
            description: calendar.description,
            is_master: calendar.is_master,
            is_active: calendar.is_active,
            created_at: now,
            updated_at: now,
        };
        state.calendars.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, calendar_id: CalendarId, patch: CalendarPatch) -> Result<Calendar> {
        let mut state = self.state.lock().unwrap();
        let calendar = state
            .calendars
            .iter_mut()
            .find(|c| c.id == calendar_id)
            .ok_or_else(|| KronosError::NotFound(format!("calendar {calendar_id} not found")))?;
        if let Some(name) = patch.name {
            calendar.name = name;
        }
        if let Some(description) = patch.description {
            calendar.description = Some(description);
        }
        if let Some(is_active) = patch.is_active {
            calendar.is_active = is_active;
        }
        calendar.updated_at = Utc::now();
        Ok(calendar.clone())
    }

    async fn deactivate(&self, calendar_id: CalendarId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let calendar = state
            .calendars
            .iter_mut()
            .find(|c| c.id == calendar_id)
            .ok_or_else(|| KronosError::NotFound(format!("calendar {calendar_id} not found")))?;
        calendar.is_active = false;
        calendar.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, calendar_id: CalendarId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.calendars.len();
        state.calendars.retain(|c| c.id != calendar_id);
        if state.calendars.len() == before {
            return Err(KronosError::NotFound(format!("calendar {calendar_id} not found")));
        }
        state.events.retain(|e| e.calendar_id != calendar_id);
        Ok(())
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn events_for_calendar(&self, calendar_id: CalendarId) -> Result<Vec<Event>> {
        let state = self.state.lock().unwrap();
        Ok(state.events.iter().filter(|e| e.calendar_id == calendar_id).cloned().collect())
    }

    async fn events_for_calendars(&self, calendar_ids: &[CalendarId]) -> Result<Vec<Event>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|e| calendar_ids.contains(&e.calendar_id))
            .cloned()
            .collect())
    }

    async fn count_for_calendar(&self, calendar_id: CalendarId) -> Result<u64> {
        let state = self.state.lock().unwrap();
        Ok(state.events.iter().filter(|e| e.calendar_id == calendar_id).count() as u64)
    }

    async fn find_by_provider_key(
        &self,
        calendar_id: CalendarId,
        provider_event_id: &str,
    ) -> Result<Option<Event>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .find(|e| e.calendar_id == calendar_id && e.provider_event_id == provider_event_id)
            .cloned())
    }

    async fn create(&self, event: NewEvent) -> Result<Event> {
        let mut state = self.state.lock().unwrap();
        insert_event(&mut state, &event)
    }

    async fn update(&self, event_id: EventId, patch: EventPatch) -> Result<Event> {
        let mut state = self.state.lock().unwrap();
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| KronosError::NotFound(format!("event {event_id} not found")))?;
        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = Some(description);
        }
        if let Some(location) = patch.location {
            event.location = Some(location);
        }
        if let Some(start_time) = patch.start_time {
            event.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            event.end_time = end_time;
        }
        if let Some(status) = patch.status {
            event.status = status;
        }
        if let Some(visibility) = patch.visibility {
            event.visibility = visibility;
        }
        if event.start_time >= event.end_time {
            return Err(KronosError::InvalidInput(
                "event time range must satisfy start < end".to_string(),
            ));
        }
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete(&self, event_id: EventId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.events.len();
        state.events.retain(|e| e.id != event_id);
        if state.events.len() == before {
            return Err(KronosError::NotFound(format!("event {event_id} not found")));
        }
        Ok(())
    }

    async fn insert_batch(&self, events: Vec<NewEvent>) -> Result<BatchInsertOutcome> {
        let mut state = self.state.lock().unwrap();
        let mut outcome = BatchInsertOutcome::default();
        for draft in &events {
            if state.failing_calendars.contains(&draft.calendar_id) {
                return Err(KronosError::Database(format!(
                    "write failed for calendar {}",
                    draft.calendar_id
                )));
            }
            match insert_event(&mut state, draft) {
                Ok(_) => outcome.inserted += 1,
                Err(KronosError::Conflict(_)) => outcome.skipped += 1,
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    async fn delete_by_key_prefix(
        &self,
        calendar_ids: &[CalendarId],
        prefix: &str,
    ) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.events.len();
        state.events.retain(|e| {
            !(calendar_ids.contains(&e.calendar_id) && e.provider_event_id.starts_with(prefix))
        });
        Ok((before - state.events.len()) as u64)
    }
}
