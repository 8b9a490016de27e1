//! SQLite-backed implementation of the EventRepository port.
//!
//! `insert_batch` is the engine's idempotent write path: INSERT OR IGNORE
//! against the `(calendar_id, provider_event_id)` uniqueness constraint
//! inside one transaction, reporting how many rows were actually written.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kronos_core::sync::ports::{BatchInsertOutcome, EventRepository};
use kronos_domain::{
    CalendarId, Event, EventId, EventPatch, EventStatus, EventVisibility, KronosError, NewEvent,
    Result,
};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};
use tracing::{debug, instrument};

use super::calendar_repository::ts_to_datetime;
use super::pool::DbPool;
use crate::errors::InfraError;

const EVENT_COLUMNS: &str = "id, calendar_id, provider_event_id, title, description, location,
        start_ts, end_ts, timezone, is_all_day, status, visibility, created_at, updated_at";

/// SQLite implementation of EventRepository
pub struct SqliteEventRepository {
    pool: Arc<DbPool>,
}

impl SqliteEventRepository {
    /// Create a new event repository
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn fetch_by_id(&self, event_id: EventId) -> Result<Option<Event>> {
        let conn = self.pool.get()?;
        let result = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![event_id],
                map_event,
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(result)
    }
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    let status: String = row.get(10)?;
    let status = status.parse::<EventStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let visibility: String = row.get(11)?;
    let visibility = visibility.parse::<EventVisibility>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Event {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        provider_event_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        location: row.get(5)?,
        start_time: ts_to_datetime(row.get(6)?, 6)?,
        end_time: ts_to_datetime(row.get(7)?, 7)?,
        timezone: row.get(8)?,
        is_all_day: row.get(9)?,
        status,
        visibility,
        created_at: ts_to_datetime(row.get(12)?, 12)?,
        updated_at: ts_to_datetime(row.get(13)?, 13)?,
    })
}

const INSERT_SQL: &str = "INSERT INTO events (
        calendar_id, provider_event_id, title, description, location,
        start_ts, end_ts, timezone, is_all_day, status, visibility,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

const INSERT_OR_IGNORE_SQL: &str = "INSERT OR IGNORE INTO events (
        calendar_id, provider_event_id, title, description, location,
        start_ts, end_ts, timezone, is_all_day, status, visibility,
        created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)";

#[async_trait]
impl EventRepository for SqliteEventRepository {
    #[instrument(skip(self))]
    async fn events_for_calendar(&self, calendar_id: CalendarId) -> Result<Vec<Event>> {
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE calendar_id = ?1 ORDER BY start_ts ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![calendar_id], map_event)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        Ok(rows)
    }

    #[instrument(skip(self, calendar_ids), fields(calendars = calendar_ids.len()))]
    async fn events_for_calendars(&self, calendar_ids: &[CalendarId]) -> Result<Vec<Event>> {
        if calendar_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get()?;
        let placeholders = vec!["?"; calendar_ids.len()].join(", ");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE calendar_id IN ({placeholders})
                 ORDER BY start_ts ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params_from_iter(calendar_ids.iter()), map_event)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        debug!(count = rows.len(), "retrieved events across calendars");

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn count_for_calendar(&self, calendar_id: CalendarId) -> Result<u64> {
        let conn = self.pool.get()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM events WHERE calendar_id = ?1",
                params![calendar_id],
                |row| row.get(0),
            )
            .map_err(InfraError::from)?;
        Ok(count as u64)
    }

    #[instrument(skip(self, provider_event_id))]
    async fn find_by_provider_key(
        &self,
        calendar_id: CalendarId,
        provider_event_id: &str,
    ) -> Result<Option<Event>> {
        let conn = self.pool.get()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE calendar_id = ?1 AND provider_event_id = ?2"
                ),
                params![calendar_id, provider_event_id],
                map_event,
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(result)
    }

    #[instrument(skip(self, event), fields(calendar_id = event.calendar_id))]
    async fn create(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();
        conn.execute(
            INSERT_SQL,
            params![
                event.calendar_id,
                event.provider_event_id,
                event.title,
                event.description,
                event.location,
                event.start_time.timestamp(),
                event.end_time.timestamp(),
                event.timezone,
                event.is_all_day,
                event.status.as_str(),
                event.visibility.as_str(),
                now,
                now,
            ],
        )
        .map_err(InfraError::from)?;

        let id = conn.last_insert_rowid();
        self.fetch_by_id(id)?
            .ok_or_else(|| KronosError::Internal(format!("event {id} vanished after insert")))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, event_id: EventId, patch: EventPatch) -> Result<Event> {
        let mut event = self
            .fetch_by_id(event_id)?
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

        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE events SET title = ?1, description = ?2, location = ?3, start_ts = ?4,
                    end_ts = ?5, status = ?6, visibility = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                event.title,
                event.description,
                event.location,
                event.start_time.timestamp(),
                event.end_time.timestamp(),
                event.status.as_str(),
                event.visibility.as_str(),
                Utc::now().timestamp(),
                event_id,
            ],
        )
        .map_err(InfraError::from)?;

        self.fetch_by_id(event_id)?
            .ok_or_else(|| KronosError::NotFound(format!("event {event_id} not found")))
    }

    #[instrument(skip(self))]
    async fn delete(&self, event_id: EventId) -> Result<()> {
        let conn = self.pool.get()?;
        let changed = conn
            .execute("DELETE FROM events WHERE id = ?1", params![event_id])
            .map_err(InfraError::from)?;
        if changed == 0 {
            return Err(KronosError::NotFound(format!("event {event_id} not found")));
        }
        Ok(())
    }

    #[instrument(skip(self, events), fields(batch_size = events.len()))]
    async fn insert_batch(&self, events: Vec<NewEvent>) -> Result<BatchInsertOutcome> {
        for event in &events {
            event.validate()?;
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction().map_err(InfraError::from)?;
        let now = Utc::now().timestamp();
        let mut outcome = BatchInsertOutcome::default();

        for event in &events {
            let changed = tx
                .execute(
                    INSERT_OR_IGNORE_SQL,
                    params![
                        event.calendar_id,
                        event.provider_event_id,
                        event.title,
                        event.description,
                        event.location,
                        event.start_time.timestamp(),
                        event.end_time.timestamp(),
                        event.timezone,
                        event.is_all_day,
                        event.status.as_str(),
                        event.visibility.as_str(),
                        now,
                        now,
                    ],
                )
                .map_err(InfraError::from)?;
            if changed == 0 {
                outcome.skipped += 1;
            } else {
                outcome.inserted += 1;
            }
        }

        tx.commit().map_err(InfraError::from)?;

        debug!(inserted = outcome.inserted, skipped = outcome.skipped, "event batch committed");

        Ok(outcome)
    }

    #[instrument(skip(self, calendar_ids), fields(calendars = calendar_ids.len()))]
    async fn delete_by_key_prefix(
        &self,
        calendar_ids: &[CalendarId],
        prefix: &str,
    ) -> Result<u64> {
        if calendar_ids.is_empty() {
            return Ok(0);
        }
        let conn = self.pool.get()?;
        let placeholders = vec!["?"; calendar_ids.len()].join(", ");
        // substr comparison instead of LIKE: the busy prefix contains '_',
        // which LIKE treats as a wildcard.
        let sql = format!(
            "DELETE FROM events
             WHERE calendar_id IN ({placeholders})
               AND substr(provider_event_id, 1, length(?{n})) = ?{n}",
            n = calendar_ids.len() + 1
        );
        let mut values: Vec<&dyn ToSql> = calendar_ids.iter().map(|id| id as &dyn ToSql).collect();
        values.push(&prefix as &dyn ToSql);
        let deleted = conn.execute(&sql, values.as_slice()).map_err(InfraError::from)?;

        debug!(deleted, prefix, "deleted events by key prefix");

        Ok(deleted as u64)
    }
}
