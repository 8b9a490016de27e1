//! Sync engine - core business logic
//!
//! Mirrors source-calendar events onto the master calendar and derives
//! cross-calendar busy blocks, idempotently. All writes are tagged with a
//! derived key so repeated runs produce no duplicate side effects.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use kronos_domain::constants::{
    BUSY_BLOCK_TITLE, MASTER_CALENDAR_DESCRIPTION, MASTER_CALENDAR_NAME,
    MASTER_CALENDAR_PROVIDER_ID,
};
use kronos_domain::{
    BusyBlockReport, Calendar, CalendarFailure, CalendarId, CalendarProvider,
    ClearBusyBlocksReport, Event, KronosError, MirrorReport, NewCalendar, NewEvent, Result,
    SyncConfig, SyncSummary, UserId,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::ports::{BatchInsertOutcome, CalendarRepository, EventRepository};
use crate::derived_key::{derive_key, is_derived_key, SyncPurpose, BUSY_KEY_PREFIX};

/// Sync engine service
///
/// Operations for one user are serialized through an internal per-user
/// lock; operations for different users run independently. Each public
/// operation is bounded by the configured run deadline and reports partial
/// completion instead of losing the batch.
pub struct SyncService {
    calendars: Arc<dyn CalendarRepository>,
    events: Arc<dyn EventRepository>,
    config: SyncConfig,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl SyncService {
    /// Create a new sync service over explicit store handles.
    pub fn new(
        calendars: Arc<dyn CalendarRepository>,
        events: Arc<dyn EventRepository>,
        config: SyncConfig,
    ) -> Self {
        Self { calendars, events, config, user_locks: Mutex::new(HashMap::new()) }
    }

    /// Create-or-fetch the user's master calendar.
    ///
    /// Keyed on `(user, is_master = true)`; a concurrent create losing the
    /// race recovers by fetching the winner.
    #[instrument(skip(self))]
    pub async fn ensure_master_calendar(&self, user_id: UserId) -> Result<Calendar> {
        if let Some(existing) = self.calendars.find_master(user_id).await? {
            return Ok(existing);
        }

        let draft = NewCalendar {
            user_id,
            provider: CalendarProvider::Google,
            provider_calendar_id: MASTER_CALENDAR_PROVIDER_ID.to_string(),
            name: MASTER_CALENDAR_NAME.to_string(),
            description: Some(MASTER_CALENDAR_DESCRIPTION.to_string()),
            is_master: true,
            is_active: true,
        };

        match self.calendars.create(draft).await {
            Ok(calendar) => {
                info!(user_id, calendar_id = calendar.id, "created master calendar");
                Ok(calendar)
            }
            Err(KronosError::Conflict(_)) => {
                debug!(user_id, "master calendar created concurrently, fetching winner");
                self.calendars.find_master(user_id).await?.ok_or_else(|| {
                    KronosError::Internal(
                        "master calendar create conflicted but no row exists".to_string(),
                    )
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Mirror every organic source-calendar event onto the master calendar
    /// exactly once.
    #[instrument(skip(self))]
    pub async fn mirror_to_master(&self, user_id: UserId) -> Result<MirrorReport> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        let (report, _master_id) = self.mirror_locked(user_id).await?;
        Ok(report)
    }

    /// Derive BUSY placeholders on every source calendar for every organic
    /// event on every other source calendar.
    #[instrument(skip(self))]
    pub async fn propagate_busy_blocks(&self, user_id: UserId) -> Result<BusyBlockReport> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        let deadline = self.run_deadline();
        self.propagate_locked(user_id, deadline).await
    }

    /// Combined run: mirror, then optionally propagate busy blocks.
    ///
    /// The busy-block step's outcome is reported independently; its failure
    /// never fails the call.
    #[instrument(skip(self), fields(run_id = %Uuid::now_v7()))]
    pub async fn sync(&self, user_id: UserId, include_busy_blocks: bool) -> Result<SyncSummary> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;
        let deadline = self.run_deadline();

        let (mirror, master_id) = self.mirror_locked(user_id).await?;
        let total_master_events = self.events.count_for_calendar(master_id).await?;

        let (busy_blocks, busy_block_error) = if include_busy_blocks {
            match self.propagate_locked(user_id, deadline).await {
                Ok(report) => (Some(report), None),
                Err(e) => {
                    error!(user_id, error = %e, "busy-block propagation failed");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        info!(
            user_id,
            mirrored = mirror.mirrored_count,
            total_master_events,
            "sync run completed"
        );

        Ok(SyncSummary {
            mirrored_count: mirror.mirrored_count,
            source_calendar_count: mirror.source_calendar_count,
            total_master_events,
            busy_blocks,
            busy_block_error,
        })
    }

    /// Delete every busy-block placeholder across the user's calendars.
    ///
    /// Matches the `busy_` derived-key namespace, not the literal title, so
    /// organic events that happen to be titled BUSY are left alone.
    #[instrument(skip(self))]
    pub async fn clear_busy_blocks(&self, user_id: UserId) -> Result<ClearBusyBlocksReport> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let calendars = self.calendars.find_all_for_user(user_id).await?;
        let calendar_ids: Vec<CalendarId> = calendars.iter().map(|c| c.id).collect();
        let deleted_count = self.events.delete_by_key_prefix(&calendar_ids, BUSY_KEY_PREFIX).await?;

        info!(user_id, deleted_count, "cleared busy blocks");

        Ok(ClearBusyBlocksReport { deleted_count })
    }

    async fn mirror_locked(&self, user_id: UserId) -> Result<(MirrorReport, CalendarId)> {
        let master = self.calendars.find_master(user_id).await?.ok_or_else(|| {
            KronosError::NotFound(format!(
                "master calendar not found for user {user_id}; create one first"
            ))
        })?;

        let sources = self.calendars.find_active_sources(user_id).await?;
        let source_ids: Vec<CalendarId> = sources.iter().map(|c| c.id).collect();
        let source_events = self.events.events_for_calendars(&source_ids).await?;

        let existing_keys: HashSet<String> = self
            .events
            .events_for_calendar(master.id)
            .await?
            .into_iter()
            .map(|e| e.provider_event_id)
            .collect();

        let mut drafts = Vec::new();
        for event in source_events.iter().filter(|e| !is_derived_key(&e.provider_event_id)) {
            let key = derive_key(SyncPurpose::Mirror, event.id);
            if existing_keys.contains(&key) {
                continue;
            }
            drafts.push(mirror_draft(master.id, key, event));
        }

        let outcome = self.insert_derived_batch(drafts, "mirror").await?;

        debug!(
            user_id,
            mirrored = outcome.inserted,
            skipped = outcome.skipped,
            source_calendars = sources.len(),
            "mirror pass finished"
        );

        Ok((
            MirrorReport {
                mirrored_count: outcome.inserted,
                source_calendar_count: sources.len() as u64,
            },
            master.id,
        ))
    }

    async fn propagate_locked(
        &self,
        user_id: UserId,
        deadline: Instant,
    ) -> Result<BusyBlockReport> {
        let sources = self.calendars.find_active_sources(user_id).await?;
        if sources.len() < 2 {
            debug!(user_id, "fewer than two source calendars, nothing to propagate");
            return Ok(BusyBlockReport::default());
        }

        let source_ids: Vec<CalendarId> = sources.iter().map(|c| c.id).collect();
        let all_events = self.events.events_for_calendars(&source_ids).await?;

        let mut by_calendar: HashMap<CalendarId, Vec<Event>> = HashMap::new();
        for event in all_events {
            by_calendar.entry(event.calendar_id).or_default().push(event);
        }

        let mut report = BusyBlockReport::default();

        for (index, target) in sources.iter().enumerate() {
            if Instant::now() >= deadline {
                warn!(user_id, "sync run deadline exceeded, returning partial result");
                for remaining in &sources[index..] {
                    report.failed_calendars.push(CalendarFailure {
                        calendar_id: remaining.id,
                        error: "run deadline exceeded before this calendar was processed"
                            .to_string(),
                    });
                }
                break;
            }

            let existing_keys: HashSet<&str> = by_calendar
                .get(&target.id)
                .map(|events| events.iter().map(|e| e.provider_event_id.as_str()).collect())
                .unwrap_or_default();

            let mut drafts = Vec::new();
            for other in sources.iter().filter(|c| c.id != target.id) {
                let Some(events) = by_calendar.get(&other.id) else { continue };
                for event in events.iter().filter(|e| !is_derived_key(&e.provider_event_id)) {
                    let key = derive_key(SyncPurpose::Busy, event.id);
                    if existing_keys.contains(key.as_str()) {
                        continue;
                    }
                    drafts.push(busy_draft(target.id, key, event));
                }
            }

            // One commit per target calendar; a failed target never aborts
            // the others.
            match self.insert_derived_batch(drafts, "busy-block").await {
                Ok(outcome) => report.placeholders_created += outcome.inserted,
                Err(e) => {
                    error!(
                        user_id,
                        calendar_id = target.id,
                        error = %e,
                        "busy-block batch failed for target calendar"
                    );
                    report
                        .failed_calendars
                        .push(CalendarFailure { calendar_id: target.id, error: e.to_string() });
                }
            }
        }

        debug!(
            user_id,
            created = report.placeholders_created,
            failed = report.failed_calendars.len(),
            "busy-block pass finished"
        );

        Ok(report)
    }

    /// Run an idempotent derived-event batch, recovering a duplicate-key
    /// conflict as "already synced".
    async fn insert_derived_batch(
        &self,
        drafts: Vec<NewEvent>,
        kind: &str,
    ) -> Result<BatchInsertOutcome> {
        let draft_count = drafts.len() as u64;
        if draft_count == 0 {
            return Ok(BatchInsertOutcome::default());
        }

        match self.events.insert_batch(drafts).await {
            Ok(outcome) => Ok(outcome),
            Err(KronosError::Conflict(msg)) => {
                warn!(kind, %msg, "duplicate derived key reported by store, treating as already synced");
                Ok(BatchInsertOutcome { inserted: 0, skipped: draft_count })
            }
            Err(e) => Err(e),
        }
    }

    fn run_deadline(&self) -> Instant {
        Instant::now() + Duration::from_secs(self.config.run_deadline_secs)
    }

    async fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(locks.entry(user_id).or_default())
    }
}

fn mirror_draft(master_id: CalendarId, key: String, source: &Event) -> NewEvent {
    NewEvent {
        calendar_id: master_id,
        provider_event_id: key,
        // Bracketed title marks the copy as synced.
        title: format!("[{}]", source.title),
        description: Some(format!(
            "Synced from calendar {}: {}",
            source.calendar_id,
            source.description.as_deref().unwrap_or_default()
        )),
        location: source.location.clone(),
        start_time: source.start_time,
        end_time: source.end_time,
        timezone: source.timezone.clone(),
        is_all_day: source.is_all_day,
        status: source.status,
        visibility: kronos_domain::EventVisibility::Default,
    }
}

fn busy_draft(target_id: CalendarId, key: String, origin: &Event) -> NewEvent {
    NewEvent {
        calendar_id: target_id,
        provider_event_id: key,
        title: BUSY_BLOCK_TITLE.to_string(),
        description: Some(format!("Busy due to event in another calendar: {}", origin.title)),
        location: None,
        start_time: origin.start_time,
        end_time: origin.end_time,
        timezone: origin.timezone.clone(),
        is_all_day: origin.is_all_day,
        status: kronos_domain::EventStatus::Confirmed,
        // Private so no business content leaks through the placeholder.
        visibility: kronos_domain::EventVisibility::Private,
    }
}
