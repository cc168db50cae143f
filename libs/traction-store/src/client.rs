//! SQLite client with settings tuned for a single-node engine

use crate::error::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Pooled SQLite handle for the norm and cache tables
#[derive(Debug, Clone)]
pub struct StoreClient {
    pool: SqlitePool,
    db_path: String,
}

impl StoreClient {
    /// Open (creating if missing) a database file with WAL journaling
    pub async fn new(db_path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .journal_mode(SqliteJournalMode::Wal) // Concurrent readers during writes
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        // 2MB page cache (negative value means KB)
        sqlx::query("PRAGMA cache_size = -2000").execute(&pool).await?;

        info!(path = %db_path_str, "SQLite database connected");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// In-memory database for tests
    ///
    /// The pool is capped at one connection that never expires: each SQLite
    /// `:memory:` connection is its own database, so recycling or widening
    /// the pool would hand callers empty tables.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            db_path: ":memory:".to_string(),
        })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            db_path: "from_pool".to_string(),
        }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Check if database is accessible
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Vacuum database to reclaim space
    pub async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        info!(path = %self.db_path, "Database vacuumed");
        Ok(())
    }
}
