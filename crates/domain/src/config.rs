//! Configuration structures
//!
//! Deserialized from environment variables or config files by the infra
//! loader. All fields have defaults so partial files are accepted.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_DB_POOL_SIZE, DEFAULT_INCLUDE_BUSY_BLOCKS,
    DEFAULT_SYNC_DEADLINE_SECS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path(), pool_size: default_pool_size() }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Whether a combined sync run also propagates busy blocks.
    #[serde(default = "default_include_busy_blocks")]
    pub include_busy_blocks: bool,
    /// Overall deadline for one sync run. On expiry the run returns the
    /// counts accumulated so far instead of losing the batch.
    #[serde(default = "default_deadline_secs")]
    pub run_deadline_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            include_busy_blocks: default_include_busy_blocks(),
            run_deadline_secs: default_deadline_secs(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_include_busy_blocks() -> bool {
    DEFAULT_INCLUDE_BUSY_BLOCKS
}

fn default_deadline_secs() -> u64 {
    DEFAULT_SYNC_DEADLINE_SECS
}
