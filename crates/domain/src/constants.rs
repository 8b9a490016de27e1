//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Busy-block placeholders
pub const BUSY_BLOCK_TITLE: &str = "BUSY";

// Master calendar provisioning defaults
pub const MASTER_CALENDAR_PROVIDER_ID: &str = "kronos_master";
pub const MASTER_CALENDAR_NAME: &str = "Kronos Master Calendar";
pub const MASTER_CALENDAR_DESCRIPTION: &str = "Aggregated calendar for booking conflicts";

// Sync run configuration
pub const DEFAULT_SYNC_DEADLINE_SECS: u64 = 60;
pub const DEFAULT_INCLUDE_BUSY_BLOCKS: bool = true;

// Database configuration
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;
pub const DEFAULT_DB_PATH: &str = "kronos.db";

// Event defaults
pub const DEFAULT_TIMEZONE: &str = "UTC";
