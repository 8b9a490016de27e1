//! Sync engine: ports and orchestration.

pub mod ports;
pub mod service;

pub use ports::{BatchInsertOutcome, CalendarRepository, EventRepository};
pub use service::SyncService;
