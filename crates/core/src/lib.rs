//! # Kronos Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Interval utilities and the derived-key deriver
//! - Conflict detection
//! - The sync engine and its port interfaces (traits)
//! - The read-only status reporter
//!
//! ## Architecture Principles
//! - Only depends on `kronos-domain`
//! - No database or HTTP code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod conflicts;
pub mod derived_key;
pub mod interval;
pub mod status;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use conflicts::{find_conflict_pairs, find_conflicts};
pub use derived_key::{derive_key, is_derived_key, parse_key, SyncPurpose};
pub use status::StatusService;
pub use sync::ports::{BatchInsertOutcome, CalendarRepository, EventRepository};
pub use sync::SyncService;
