//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `KRONOS_DB_PATH`: Database file path (required for env loading)
//! - `KRONOS_DB_POOL_SIZE`: Connection pool size
//! - `KRONOS_SYNC_INCLUDE_BUSY_BLOCKS`: Whether combined syncs propagate
//!   busy blocks (true/false)
//! - `KRONOS_SYNC_DEADLINE_SECS`: Overall deadline for one sync run
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.toml` or `./config.json`
//! 2. `./kronos.toml` or `./kronos.json`
//! 3. The same names in the parent directory

use std::path::{Path, PathBuf};

use kronos_domain::{Config, DatabaseConfig, KronosError, Result, SyncConfig};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `KronosError::Config` if configuration cannot be loaded from
/// either source or a file has an invalid format.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `KRONOS_DB_PATH` must be present; the remaining variables fall back to
/// their defaults.
///
/// # Errors
/// Returns `KronosError::Config` if the database path is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("KRONOS_DB_PATH")?;
    let pool_size = match std::env::var("KRONOS_DB_POOL_SIZE") {
        Ok(value) => value
            .parse::<u32>()
            .map_err(|e| KronosError::Config(format!("invalid pool size: {e}")))?,
        Err(_) => DatabaseConfig::default().pool_size,
    };

    let sync_defaults = SyncConfig::default();
    let include_busy_blocks =
        env_bool("KRONOS_SYNC_INCLUDE_BUSY_BLOCKS", sync_defaults.include_busy_blocks);
    let run_deadline_secs = match std::env::var("KRONOS_SYNC_DEADLINE_SECS") {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| KronosError::Config(format!("invalid sync deadline: {e}")))?,
        Err(_) => sync_defaults.run_deadline_secs,
    };

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size },
        sync: SyncConfig { include_busy_blocks, run_deadline_secs },
    })
}

/// Load configuration from a file, probing default locations when no path
/// is given.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_paths().ok_or_else(|| {
            KronosError::Config("no config file found in probed locations".to_string())
        })?,
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| {
        KronosError::Config(format!("failed to read {}: {e}", path.display()))
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| KronosError::Config(format!("invalid TOML in {}: {e}", path.display())))?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| KronosError::Config(format!("invalid JSON in {}: {e}", path.display())))?,
        other => {
            return Err(KronosError::Config(format!(
                "unsupported config format: {:?} ({})",
                other,
                path.display()
            )))
        }
    };

    tracing::info!(path = %path.display(), "configuration loaded from file");

    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: [&str; 8] = [
        "config.toml",
        "config.json",
        "kronos.toml",
        "kronos.json",
        "../config.toml",
        "../config.json",
        "../kronos.toml",
        "../kronos.json",
    ];
    CANDIDATES.iter().map(PathBuf::from).find(|candidate| candidate.exists())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| KronosError::Config(format!("missing environment variable: {name}")))
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
