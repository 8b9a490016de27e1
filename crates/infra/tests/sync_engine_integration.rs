//! End-to-end tests: the sync engine running against the real SQLite store.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use kronos_core::sync::ports::{CalendarRepository, EventRepository};
use kronos_core::{find_conflicts, StatusService, SyncService};
use kronos_domain::{
    CalendarProvider, EventStatus, EventVisibility, KronosError, NewCalendar, NewEvent,
    SyncConfig, UserId,
};
use kronos_infra::external_sync::ExternalSyncService;
use kronos_infra::{DbManager, SqliteCalendarRepository, SqliteEventRepository};
use tempfile::TempDir;

const USER: UserId = 1;

struct Harness {
    calendars: Arc<SqliteCalendarRepository>,
    events: Arc<SqliteEventRepository>,
    engine: SyncService,
    _temp: TempDir,
}

fn harness() -> Harness {
    let temp = TempDir::new().expect("temp dir created");
    let manager = DbManager::new(temp.path().join("kronos.db"), 4).expect("manager created");
    manager.run_migrations().expect("migrations run");

    let calendars = Arc::new(SqliteCalendarRepository::new(Arc::clone(manager.pool())));
    let events = Arc::new(SqliteEventRepository::new(Arc::clone(manager.pool())));
    let engine = SyncService::new(
        Arc::clone(&calendars) as Arc<dyn CalendarRepository>,
        Arc::clone(&events) as Arc<dyn EventRepository>,
        SyncConfig::default(),
    );

    Harness { calendars, events, engine, _temp: temp }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

async fn add_source(h: &Harness, key: &str, name: &str) -> kronos_domain::Calendar {
    h.calendars
        .create(NewCalendar {
            user_id: USER,
            provider: CalendarProvider::Google,
            provider_calendar_id: key.to_string(),
            name: name.to_string(),
            description: None,
            is_master: false,
            is_active: true,
        })
        .await
        .expect("source calendar created")
}

async fn add_event(
    h: &Harness,
    calendar_id: i64,
    key: &str,
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> kronos_domain::Event {
    h.events
        .create(NewEvent {
            calendar_id,
            provider_event_id: key.to_string(),
            title: title.to_string(),
            description: None,
            location: None,
            start_time: start,
            end_time: end,
            timezone: "UTC".to_string(),
            is_all_day: false,
            status: EventStatus::Confirmed,
            visibility: EventVisibility::Default,
        })
        .await
        .expect("event created")
}

#[tokio::test]
async fn full_sync_scenario_on_sqlite() {
    let h = harness();
    let master = h.engine.ensure_master_calendar(USER).await.unwrap();
    let a = add_source(&h, "cal-a", "A").await;
    let b = add_source(&h, "cal-b", "B").await;
    let call = add_event(&h, a.id, "evt-call", "Call", at(9, 0), at(10, 0)).await;
    let write = add_event(&h, b.id, "evt-write", "Write", at(9, 30), at(10, 30)).await;

    let summary = h.engine.sync(USER, true).await.unwrap();

    assert_eq!(summary.mirrored_count, 2);
    assert_eq!(summary.source_calendar_count, 2);
    assert_eq!(summary.total_master_events, 2);
    assert_eq!(summary.busy_blocks.as_ref().unwrap().placeholders_created, 2);
    assert!(summary.busy_block_error.is_none());

    // Mirrors land on the master with derived keys and bracketed titles.
    let mirrors = h.events.events_for_calendar(master.id).await.unwrap();
    assert_eq!(mirrors.len(), 2);
    assert!(mirrors.iter().any(|e| e.title == "[Call]"
        && e.provider_event_id == format!("sync_{}", call.id)));
    assert!(mirrors.iter().any(|e| e.title == "[Write]"
        && e.provider_event_id == format!("sync_{}", write.id)));

    // Each source carries the other's busy shadow.
    let a_events = h.events.events_for_calendar(a.id).await.unwrap();
    let shadow_on_a = a_events
        .iter()
        .find(|e| e.provider_event_id == format!("busy_{}", write.id))
        .expect("A shadows B's event");
    assert_eq!(shadow_on_a.title, "BUSY");
    assert_eq!(shadow_on_a.visibility, EventVisibility::Private);
    assert_eq!(shadow_on_a.start_time, at(9, 30));
    assert_eq!(shadow_on_a.end_time, at(10, 30));

    let b_events = h.events.events_for_calendar(b.id).await.unwrap();
    assert!(b_events.iter().any(|e| e.provider_event_id == format!("busy_{}", call.id)));

    // The organic events overlap 9:30-10:00 and both get flagged.
    let conflicted = find_conflicts(&[call, write], None);
    assert_eq!(conflicted.len(), 2);

    // The whole combined run is idempotent on the real store too.
    let repeat = h.engine.sync(USER, true).await.unwrap();
    assert_eq!(repeat.mirrored_count, 0);
    assert_eq!(repeat.busy_blocks.unwrap().placeholders_created, 0);
    assert_eq!(repeat.total_master_events, 2);
    assert_eq!(h.events.count_for_calendar(a.id).await.unwrap(), 2);
    assert_eq!(h.events.count_for_calendar(b.id).await.unwrap(), 2);
}

#[tokio::test]
async fn clear_busy_blocks_uses_the_key_namespace() {
    let h = harness();
    h.engine.ensure_master_calendar(USER).await.unwrap();
    let a = add_source(&h, "cal-a", "A").await;
    let b = add_source(&h, "cal-b", "B").await;
    add_event(&h, a.id, "evt-1", "Alpha", at(9, 0), at(10, 0)).await;
    add_event(&h, b.id, "evt-2", "Beta", at(11, 0), at(12, 0)).await;
    // Organic event literally titled BUSY must survive the purge.
    let decoy = add_event(&h, a.id, "evt-3", "BUSY", at(15, 0), at(16, 0)).await;

    h.engine.propagate_busy_blocks(USER).await.unwrap();
    let cleared = h.engine.clear_busy_blocks(USER).await.unwrap();

    // busy_Alpha and busy_decoy on B, busy_Beta on A.
    assert_eq!(cleared.deleted_count, 3);
    let a_events = h.events.events_for_calendar(a.id).await.unwrap();
    assert!(a_events.iter().any(|e| e.id == decoy.id));
    assert!(a_events.iter().all(|e| !e.provider_event_id.starts_with("busy_")));
}

#[tokio::test]
async fn status_reporter_reads_the_store() {
    let h = harness();
    let reporter = StatusService::new(
        Arc::clone(&h.calendars) as Arc<dyn CalendarRepository>,
        Arc::clone(&h.events) as Arc<dyn EventRepository>,
    );

    let before = reporter.sync_status(USER).await.unwrap();
    assert!(!before.master.exists);
    assert_eq!(before.source_calendars.len(), 0);

    let master = h.engine.ensure_master_calendar(USER).await.unwrap();
    let a = add_source(&h, "cal-a", "A").await;
    let b = add_source(&h, "cal-b", "B").await;
    add_event(&h, a.id, "evt-1", "Alpha", at(9, 0), at(10, 0)).await;
    add_event(&h, b.id, "evt-2", "Beta", at(9, 30), at(10, 30)).await;
    h.engine.sync(USER, true).await.unwrap();

    let after = reporter.sync_status(USER).await.unwrap();
    assert!(after.master.exists);
    assert_eq!(after.master.calendar_id, Some(master.id));
    assert_eq!(after.master.event_count, 2);
    assert_eq!(after.source_calendars.len(), 2);
    assert_eq!(after.source_event_count, 4);
}

#[tokio::test]
async fn ensure_master_calendar_survives_duplicate_creates() {
    let h = harness();

    let first = h.engine.ensure_master_calendar(USER).await.unwrap();
    let second = h.engine.ensure_master_calendar(USER).await.unwrap();
    assert_eq!(first.id, second.id);

    // Forcing a second master through the repository hits the partial
    // unique index and surfaces as Conflict.
    let err = h
        .calendars
        .create(NewCalendar {
            user_id: USER,
            provider: CalendarProvider::Google,
            provider_calendar_id: "another-master".to_string(),
            name: "Another".to_string(),
            description: None,
            is_master: true,
            is_active: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, KronosError::Conflict(_)));
}

#[tokio::test]
async fn deactivated_calendars_drop_out_of_sync() {
    let h = harness();
    h.engine.ensure_master_calendar(USER).await.unwrap();
    let a = add_source(&h, "cal-a", "A").await;
    let b = add_source(&h, "cal-b", "B").await;
    add_event(&h, a.id, "evt-1", "Alpha", at(9, 0), at(10, 0)).await;
    add_event(&h, b.id, "evt-2", "Beta", at(11, 0), at(12, 0)).await;

    h.calendars.deactivate(b.id).await.unwrap();

    let summary = h.engine.sync(USER, true).await.unwrap();
    assert_eq!(summary.source_calendar_count, 1);
    assert_eq!(summary.mirrored_count, 1);
    // A single active source means no busy blocks.
    assert_eq!(summary.busy_blocks.unwrap().placeholders_created, 0);
}

#[tokio::test]
async fn external_sync_is_a_typed_stub() {
    let h = harness();
    let external =
        ExternalSyncService::new(Arc::clone(&h.calendars) as Arc<dyn CalendarRepository>);

    let master = h.engine.ensure_master_calendar(USER).await.unwrap();
    let source = add_source(&h, "cal-a", "A").await;

    let report = external.sync_from_external(source.id).await.unwrap();
    assert!(!report.implemented);
    assert_eq!(report.provider, CalendarProvider::Google);

    let err = external.sync_from_external(master.id).await.unwrap_err();
    assert!(matches!(err, KronosError::InvalidInput(_)));

    let err = external.sync_from_external(9999).await.unwrap_err();
    assert!(matches!(err, KronosError::NotFound(_)));
}
