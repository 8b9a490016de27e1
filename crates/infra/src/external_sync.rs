//! Stub boundary for inbound synchronization from external providers.
//!
//! Pulling events out of Google/Microsoft/Cal.com is handled upstream; this
//! service only validates the target calendar and reports the provider as
//! not yet wired up, so callers get a typed answer instead of a dangling
//! endpoint.

use std::sync::Arc;

use kronos_core::sync::ports::CalendarRepository;
use kronos_domain::{CalendarId, CalendarProvider, KronosError, Result};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Outcome of an inbound-sync request against the stub boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSyncReport {
    pub calendar_id: CalendarId,
    pub provider: CalendarProvider,
    pub implemented: bool,
    pub message: String,
}

/// Inbound provider synchronization boundary.
pub struct ExternalSyncService {
    calendars: Arc<dyn CalendarRepository>,
}

impl ExternalSyncService {
    pub fn new(calendars: Arc<dyn CalendarRepository>) -> Self {
        Self { calendars }
    }

    /// Validate the calendar and report inbound sync as unimplemented.
    ///
    /// The master calendar is refused: it only ever receives engine-derived
    /// mirrors, never external events directly.
    #[instrument(skip(self))]
    pub async fn sync_from_external(&self, calendar_id: CalendarId) -> Result<ExternalSyncReport> {
        let calendar = self
            .calendars
            .find_by_id(calendar_id)
            .await?
            .ok_or_else(|| KronosError::NotFound(format!("calendar {calendar_id} not found")))?;

        if calendar.is_master {
            return Err(KronosError::InvalidInput(
                "cannot sync external events to the master calendar directly".to_string(),
            ));
        }

        warn!(calendar_id, provider = %calendar.provider, "external sync requested but not implemented");

        Ok(ExternalSyncReport {
            calendar_id,
            provider: calendar.provider,
            implemented: false,
            message: format!("external sync not yet implemented for {}", calendar.provider),
        })
    }
}
