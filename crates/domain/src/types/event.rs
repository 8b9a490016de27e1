//! Event records, status/visibility enumerations and the date-range
//! filter used by conflict detection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CalendarId, EventId};
use crate::errors::{KronosError, Result};

/// Event confirmation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Tentative => "tentative",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Confirmed
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = KronosError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "tentative" => Ok(Self::Tentative),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(KronosError::InvalidInput(format!("unknown event status: {other}"))),
        }
    }
}

/// Event visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVisibility {
    Default,
    Public,
    Private,
}

impl EventVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl Default for EventVisibility {
    fn default() -> Self {
        Self::Default
    }
}

impl fmt::Display for EventVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventVisibility {
    type Err = KronosError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(KronosError::InvalidInput(format!("unknown event visibility: {other}"))),
        }
    }
}

/// A single materialized event occurrence on one calendar.
///
/// `provider_event_id` is meaningful only within its calendar. Engine-derived
/// events carry a synthetic key prefix there; organic events carry whatever
/// identity the ingestion path assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub calendar_id: CalendarId,
    pub provider_event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timezone: String,
    pub is_all_day: bool,
    pub status: EventStatus,
    pub visibility: EventVisibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertion value object for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub calendar_id: CalendarId,
    pub provider_event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timezone: String,
    pub is_all_day: bool,
    pub status: EventStatus,
    pub visibility: EventVisibility,
}

impl NewEvent {
    /// Reject degenerate time ranges before they reach the store.
    ///
    /// Policy: inverted and zero-length ranges are both invalid, so conflict
    /// detection never sees a zero-width interval. The SQLite schema carries
    /// a matching CHECK constraint.
    pub fn validate(&self) -> Result<()> {
        if self.start_time >= self.end_time {
            return Err(KronosError::InvalidInput(format!(
                "event time range must satisfy start < end (got {} >= {})",
                self.start_time, self.end_time
            )));
        }
        Ok(())
    }
}

/// Partial update for an event. Only provided fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
    pub visibility: Option<EventVisibility>,
}

impl EventPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.status.is_none()
            && self.visibility.is_none()
    }
}

/// Date window for filtering events. `None` bounds are unbounded.
///
/// An event falls inside the range iff `start_time >= floor` and
/// `end_time <= ceiling`, each bound applied independently when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub floor: Option<DateTime<Utc>>,
    pub ceiling: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(floor: Option<DateTime<Utc>>, ceiling: Option<DateTime<Utc>>) -> Self {
        Self { floor, ceiling }
    }

    /// Apply both bounds to an event.
    pub fn contains(&self, event: &Event) -> bool {
        if let Some(floor) = self.floor {
            if event.start_time < floor {
                return false;
            }
        }
        if let Some(ceiling) = self.ceiling {
            if event.end_time > ceiling {
                return false;
            }
        }
        true
    }
}
