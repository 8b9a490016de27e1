//! SQLite-backed implementation of the CalendarRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kronos_core::sync::ports::CalendarRepository;
use kronos_domain::{
    Calendar, CalendarId, CalendarPatch, CalendarProvider, KronosError, NewCalendar, Result,
    UserId,
};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, instrument};

use super::pool::DbPool;
use crate::errors::InfraError;

const CALENDAR_COLUMNS: &str = "id, user_id, provider, provider_calendar_id, name, description,
        is_master, is_active, created_at, updated_at";

/// SQLite implementation of CalendarRepository
pub struct SqliteCalendarRepository {
    pool: Arc<DbPool>,
}

impl SqliteCalendarRepository {
    /// Create a new calendar repository
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_calendar(row: &Row<'_>) -> rusqlite::Result<Calendar> {
    let provider: String = row.get(2)?;
    let provider = provider.parse::<CalendarProvider>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Calendar {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider,
        provider_calendar_id: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        is_master: row.get(6)?,
        is_active: row.get(7)?,
        created_at: ts_to_datetime(row.get(8)?, 8)?,
        updated_at: ts_to_datetime(row.get(9)?, 9)?,
    })
}

pub(crate) fn ts_to_datetime(ts: i64, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            format!("timestamp {ts} out of range").into(),
        )
    })
}

impl SqliteCalendarRepository {
    fn fetch_by_id(&self, calendar_id: CalendarId) -> Result<Option<Calendar>> {
        let conn = self.pool.get()?;
        let result = conn
            .query_row(
                &format!("SELECT {CALENDAR_COLUMNS} FROM calendars WHERE id = ?1"),
                params![calendar_id],
                map_calendar,
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(result)
    }
}

#[async_trait]
impl CalendarRepository for SqliteCalendarRepository {
    #[instrument(skip(self))]
    async fn find_master(&self, user_id: UserId) -> Result<Option<Calendar>> {
        let conn = self.pool.get()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {CALENDAR_COLUMNS} FROM calendars
                     WHERE user_id = ?1 AND is_master = 1"
                ),
                params![user_id],
                map_calendar,
            )
            .optional()
            .map_err(InfraError::from)?;
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn find_active_sources(&self, user_id: UserId) -> Result<Vec<Calendar>> {
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CALENDAR_COLUMNS} FROM calendars
                 WHERE user_id = ?1 AND is_master = 0 AND is_active = 1
                 ORDER BY id ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![user_id], map_calendar)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;

        debug!(user_id, count = rows.len(), "retrieved active source calendars");

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn find_all_for_user(&self, user_id: UserId) -> Result<Vec<Calendar>> {
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CALENDAR_COLUMNS} FROM calendars WHERE user_id = ?1 ORDER BY id ASC"
            ))
            .map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params![user_id], map_calendar)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, calendar_id: CalendarId) -> Result<Option<Calendar>> {
        self.fetch_by_id(calendar_id)
    }

    #[instrument(skip(self, calendar), fields(user_id = calendar.user_id))]
    async fn create(&self, calendar: NewCalendar) -> Result<Calendar> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO calendars (
                user_id, provider, provider_calendar_id, name, description,
                is_master, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                calendar.user_id,
                calendar.provider.as_str(),
                calendar.provider_calendar_id,
                calendar.name,
                calendar.description,
                calendar.is_master,
                calendar.is_active,
                now,
                now,
            ],
        )
        .map_err(InfraError::from)?;

        let id = conn.last_insert_rowid();

        debug!(calendar_id = id, is_master = calendar.is_master, "created calendar");

        self.fetch_by_id(id)?
            .ok_or_else(|| KronosError::Internal(format!("calendar {id} vanished after insert")))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, calendar_id: CalendarId, patch: CalendarPatch) -> Result<Calendar> {
        let mut calendar = self
            .fetch_by_id(calendar_id)?
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

        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE calendars SET name = ?1, description = ?2, is_active = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                calendar.name,
                calendar.description,
                calendar.is_active,
                Utc::now().timestamp(),
                calendar_id,
            ],
        )
        .map_err(InfraError::from)?;

        self.fetch_by_id(calendar_id)?
            .ok_or_else(|| KronosError::NotFound(format!("calendar {calendar_id} not found")))
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, calendar_id: CalendarId) -> Result<()> {
        let conn = self.pool.get()?;
        let changed = conn
            .execute(
                "UPDATE calendars SET is_active = 0, updated_at = ?1 WHERE id = ?2",
                params![Utc::now().timestamp(), calendar_id],
            )
            .map_err(InfraError::from)?;
        if changed == 0 {
            return Err(KronosError::NotFound(format!("calendar {calendar_id} not found")));
        }

        debug!(calendar_id, "deactivated calendar");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, calendar_id: CalendarId) -> Result<()> {
        let conn = self.pool.get()?;
        // Events cascade via the foreign key.
        let changed = conn
            .execute("DELETE FROM calendars WHERE id = ?1", params![calendar_id])
            .map_err(InfraError::from)?;
        if changed == 0 {
            return Err(KronosError::NotFound(format!("calendar {calendar_id} not found")));
        }

        debug!(calendar_id, "deleted calendar");

        Ok(())
    }
}
