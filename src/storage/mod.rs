//! Storage implementations.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::StorageConfig;
use crate::interfaces::{Result, RetentionStore, RollupStore};

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteRetentionStore, SqliteRollupStore};

/// In-memory database path accepted by `StorageConfig::path`.
pub const MEMORY_PATH: &str = ":memory:";

/// The store implementations the engine runs against.
#[derive(Clone)]
pub struct Stores {
    pub rollup: Arc<dyn RollupStore>,
    pub retention: Arc<dyn RetentionStore>,
}

impl Stores {
    /// Build both SQLite stores over one pool.
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            rollup: Arc::new(SqliteRollupStore::new(pool.clone())),
            retention: Arc::new(SqliteRetentionStore::new(pool)),
        }
    }
}

/// Open a connection pool for the configured database.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    let in_memory = config.path == MEMORY_PATH;

    if !in_memory {
        if let Some(parent) = std::path::Path::new(&config.path).parent() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let opts = SqliteConnectOptions::new()
        .filename(&config.path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .foreign_keys(true)
        .create_if_missing(true);

    // Every connection to ":memory:" is a separate database
    let max_connections = if in_memory { 1 } else { config.max_connections };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;

    Ok(pool)
}

/// Create source and aggregate tables if they don't exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(schema::CREATE_SOURCE_TABLES)
        .execute(pool)
        .await?;
    sqlx::raw_sql(schema::CREATE_AGGREGATE_TABLES)
        .execute(pool)
        .await?;
    Ok(())
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    info!(path = %config.path, "Storage: sqlite");

    let pool = connect(config).await?;
    init_schema(&pool).await?;

    Ok(Stores::sqlite(pool))
}
