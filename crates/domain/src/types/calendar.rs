//! Calendar records and the provider enumeration.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CalendarId, UserId};
use crate::errors::KronosError;

/// External calendar provider.
///
/// Closed set; every consumption site matches exhaustively instead of
/// passing provider names around as loose strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarProvider {
    Google,
    Microsoft,
    CalDotCom,
}

impl CalendarProvider {
    /// Stable string form used in storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
            Self::CalDotCom => "caldotcom",
        }
    }
}

impl fmt::Display for CalendarProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarProvider {
    type Err = KronosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "microsoft" => Ok(Self::Microsoft),
            "caldotcom" => Ok(Self::CalDotCom),
            other => Err(KronosError::InvalidInput(format!("unknown calendar provider: {other}"))),
        }
    }
}

/// A calendar owned by exactly one user.
///
/// A calendar is either the single master calendar for its user or a
/// source calendar; the store enforces at most one master per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub id: CalendarId,
    pub user_id: UserId,
    pub provider: CalendarProvider,
    /// External identity, unique per (user, provider).
    pub provider_calendar_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_master: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Calendar {
    /// True for active, non-master calendars (the ones sync reads from).
    pub fn is_source(&self) -> bool {
        self.is_active && !self.is_master
    }
}

/// Creation value object for a calendar; identity and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalendar {
    pub user_id: UserId,
    pub provider: CalendarProvider,
    pub provider_calendar_id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_master: bool,
    pub is_active: bool,
}

/// Partial update for a calendar. Only provided fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl CalendarPatch {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_active.is_none()
    }
}
