//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. This module provides a `DatabasePool`
//! with a multi-connection reader pool for concurrent reads and a single-connection
//! writer pool for serialized writes. Both use WAL journal mode and enforce foreign keys.

use std::path::Path;
use std::str::FromStr;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

static DURABLE_MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/durable");
static CACHE_MIGRATIONS: Migrator = sqlx::migrate!("../../migrations/cache");

/// Which database a pool serves. Each has its own file and migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Durable,
    Cache,
}

impl Schema {
    fn migrator(self) -> &'static Migrator {
        match self {
            Schema::Durable => &DURABLE_MIGRATIONS,
            Schema::Cache => &CACHE_MIGRATIONS,
        }
    }
}

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool for concurrent SELECT queries.
/// - `writer`: Single-connection pool for serialized INSERT/UPDATE/DELETE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Create a new DatabasePool with split reader/writer connections.
    ///
    /// Runs the schema's migrations on the writer pool before the reader pool
    /// is opened. Both pools use WAL journal mode, foreign key enforcement,
    /// and a 5-second busy timeout.
    pub async fn new(database_url: &str, schema: Schema, max_readers: u32) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        schema.migrator().run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(max_readers.max(1))
            .connect_with(read_opts)
            .await?;

        tracing::debug!(database_url, ?schema, max_readers, "database pool opened");

        Ok(Self { reader, writer })
    }

    /// Open the database file at `path`, creating it if missing.
    pub async fn open(path: &Path, schema: Schema, max_readers: u32) -> Result<Self, sqlx::Error> {
        Self::new(&sqlite_url(path), schema, max_readers).await
    }
}

/// SQLite connection URL for a file path.
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}
