//! Sync status reporter - read-only aggregation over the store.

use std::sync::Arc;

use kronos_domain::{
    MasterCalendarStatus, Result, SourceCalendarSummary, SyncStatusReport, UserId,
};
use tracing::instrument;

use crate::sync::ports::{CalendarRepository, EventRepository};

/// Read-only sync status reporting.
///
/// Purely derived from current store state; no caching, no side effects.
pub struct StatusService {
    calendars: Arc<dyn CalendarRepository>,
    events: Arc<dyn EventRepository>,
}

impl StatusService {
    pub fn new(calendars: Arc<dyn CalendarRepository>, events: Arc<dyn EventRepository>) -> Self {
        Self { calendars, events }
    }

    /// Overview of sync state for a user: master existence and event count,
    /// source calendar identities and their aggregate event count.
    #[instrument(skip(self))]
    pub async fn sync_status(&self, user_id: UserId) -> Result<SyncStatusReport> {
        let all = self.calendars.find_all_for_user(user_id).await?;

        let master = all.iter().find(|c| c.is_master);
        let master_event_count = match master {
            Some(calendar) => self.events.count_for_calendar(calendar.id).await?,
            None => 0,
        };

        let mut source_calendars = Vec::new();
        let mut source_event_count = 0;
        for calendar in all.iter().filter(|c| !c.is_master) {
            source_event_count += self.events.count_for_calendar(calendar.id).await?;
            source_calendars.push(SourceCalendarSummary {
                id: calendar.id,
                name: calendar.name.clone(),
                provider: calendar.provider,
            });
        }

        Ok(SyncStatusReport {
            user_id,
            master: MasterCalendarStatus {
                exists: master.is_some(),
                calendar_id: master.map(|c| c.id),
                event_count: master_event_count,
            },
            source_calendars,
            source_event_count,
        })
    }
}
