//! r2d2-managed SQLite connection pool.

use std::path::Path;

use kronos_domain::Result;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use crate::errors::InfraError;

/// A pooled SQLite connection.
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Connection pool wrapper owning the per-connection pragmas.
pub struct DbPool {
    inner: r2d2::Pool<SqliteConnectionManager>,
}

impl DbPool {
    /// Open (or create) the database at `path` with the given pool size.
    pub fn new<P: AsRef<Path>>(path: P, max_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });

        let inner = r2d2::Pool::builder()
            .max_size(max_size.max(1))
            .build(manager)
            .map_err(InfraError::from)?;

        Ok(Self { inner })
    }

    /// Acquire a connection from the pool.
    pub fn get(&self) -> Result<DbConnection> {
        self.inner.get().map_err(|e| InfraError::from(e).into())
    }

    /// Maximum number of pooled connections.
    pub fn max_size(&self) -> u32 {
        self.inner.max_size()
    }
}
