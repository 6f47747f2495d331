//! # Ledger Database Handle
//!
//! Opens the SQLite pool and hands out repositories and write transactions.
//!
//! ## Readers and Writers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SqlitePool (WAL)                                 │
//! │                                                                         │
//! │   db.products() / db.sales() / ...   ─► pooled reads, never block      │
//! │                                                                         │
//! │   db.begin_write()                   ─► BEGIN                           │
//! │                                         UPDATE ledger_state (version+1) │
//! │                                         ... ledger writes ...           │
//! │                                         COMMIT                          │
//! │                                                                         │
//! │   The version bump is the first statement, so a second writer waits   │
//! │   on busy_timeout for the write lock instead of working from a stale   │
//! │   snapshot.                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::ledger_state::LedgerStateRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::service::ServiceRepository;
use crate::repository::snapshot::SnapshotRepository;
use crate::repository::stock::StockRepository;
use crate::repository::write_tx::WriteTx;

const MEMORY_PATH: &str = ":memory:";
const MEMORY_URL: &str = "sqlite::memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger lives and how many connections may touch it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/shears/ledger.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for tests.
    pub path: PathBuf,
    /// Pool size. Readers and the single active writer share it.
    pub max_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    /// How long a writer waits on SQLite's write lock before failing.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// One connection, since every connection to `:memory:` opens a
    /// separate empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_memory(&self) -> bool {
        self.path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_memory() {
            MEMORY_URL
                .parse::<SqliteConnectOptions>()
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the ledger database. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the ledger file and brings its schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.path.display(), "Opening ledger database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            wal = !config.is_memory(),
            "Ledger pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a write transaction and bumps the ledger version.
    ///
    /// Dropping the returned [`WriteTx`] without calling `commit` rolls
    /// everything back, version bump included.
    pub async fn begin_write(&self) -> DbResult<WriteTx> {
        WriteTx::begin(&self.pool).await
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn services(&self) -> ServiceRepository {
        ServiceRepository::new(self.pool.clone())
    }

    /// Stock movements and physical counts.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    pub fn snapshots(&self) -> SnapshotRepository {
        SnapshotRepository::new(self.pool.clone())
    }

    /// Ledger version and history recomputation.
    pub fn ledger_state(&self) -> LedgerStateRepository {
        LedgerStateRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        debug!("Closing ledger pool");
        self.pool.close().await;
    }

    /// True when the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_ledger_answers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[test]
    fn test_memory_config_uses_one_connection() {
        let config = DbConfig::in_memory();
        assert!(config.is_memory());
        assert_eq!(config.max_connections, 1);

        let file = DbConfig::new("/tmp/ledger.db").busy_timeout(Duration::from_secs(1));
        assert!(!file.is_memory());
        assert_eq!(file.max_connections, 5);
        assert_eq!(file.busy_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_write_bumps_version_only_on_commit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.ledger_state().version().await.unwrap(), 0);

        let tx = db.begin_write().await.unwrap();
        assert_eq!(tx.version(), 1);
        drop(tx);
        assert_eq!(db.ledger_state().version().await.unwrap(), 0);

        let tx = db.begin_write().await.unwrap();
        assert_eq!(tx.commit().await.unwrap(), 1);
        assert_eq!(db.ledger_state().version().await.unwrap(), 1);
    }
}
