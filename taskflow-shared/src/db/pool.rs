/// Database connection pool management
///
/// This module provides the SQLite connection pool used by every store. It
/// applies the pragmas the stores rely on (foreign keys, busy timeout, WAL
/// for file databases) and verifies connectivity before returning.
///
/// # In-Memory Databases
///
/// An in-memory SQLite database lives only as long as the connection that
/// opened it. When [`DatabaseConfig::path`] is `:memory:` the pool is pinned to
/// a single connection that is never reaped, so the data lives exactly as
/// long as the pool.
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         path: "taskflow.db".to_string(),
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///
///     let row: (i64,) = sqlx::query_as("SELECT ?")
///         .bind(42i64)
///         .fetch_one(&pool)
///         .await?;
///
///     Ok(())
/// }
/// ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Path value that selects an in-memory database
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Configuration for the database connection pool
///
/// All timeouts are specified in seconds for ease of configuration from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub path: String,

    /// Maximum number of connections in the pool
    ///
    /// Ignored for in-memory databases, which always use one connection
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain
    pub min_connections: u32,

    /// Timeout for acquiring a connection from the pool (seconds)
    pub connect_timeout_seconds: u64,

    /// How long a connection can remain idle before being closed (seconds)
    ///
    /// None = connections never closed due to idle time
    pub idle_timeout_seconds: Option<u64>,

    /// Maximum lifetime of a connection before forced recycling (seconds)
    pub max_lifetime_seconds: Option<u64>,

    /// How long a statement waits on a locked database before failing (seconds)
    pub busy_timeout_seconds: u64,
}

impl DatabaseConfig {
    /// Config for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH || self.path.is_empty()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "taskflow.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
            busy_timeout_seconds: 5,
        }
    }
}

/// Creates and initializes a SQLite connection pool
///
/// This function:
/// 1. Builds connection options (pragmas, create-if-missing for files)
/// 2. Creates the pool
/// 3. Performs a health check to verify the database answers
///
/// # Errors
///
/// Returns an error if the file cannot be opened or created, or the health
/// check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = config.is_in_memory();

    info!(
        path = %config.path,
        in_memory,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let busy_timeout = Duration::from_secs(config.busy_timeout_seconds);

    let options = if in_memory {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else {
        SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
    }
    .foreign_keys(true)
    .busy_timeout(busy_timeout);

    let mut pool_options = SqlitePoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds));

    if in_memory {
        // One connection, never reaped: closing it would drop the database
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        pool_options = pool_options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(config.idle_timeout_seconds.map(Duration::from_secs))
            .max_lifetime(config.max_lifetime_seconds.map(Duration::from_secs));
        debug!(
            idle_timeout_seconds = ?config.idle_timeout_seconds,
            max_lifetime_seconds = ?config.max_lifetime_seconds,
            "Set connection recycling"
        );
    }

    let pool = pool_options.connect_with(options).await?;

    health_check(&pool).await?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Performs a health check on the database connection
///
/// # Errors
///
/// Returns an error if the health check query fails
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");

    let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if result.0 == 1 {
        debug!("Database health check passed");
        Ok(())
    } else {
        warn!("Database health check returned unexpected value: {}", result.0);
        Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ))
    }
}

/// Current pool statistics for monitoring
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub active_connections: usize,

    /// Number of idle connections available
    pub idle_connections: usize,

    /// Total connections in the pool
    pub total_connections: usize,
}

pub fn get_pool_stats(pool: &SqlitePool) -> PoolStats {
    let size = pool.size();
    let idle = pool.num_idle();

    PoolStats {
        active_connections: (size as usize).saturating_sub(idle),
        idle_connections: idle,
        total_connections: size as usize,
    }
}

/// Gracefully closes the connection pool
///
/// For in-memory databases this discards all data.
pub async fn close_pool(pool: SqlitePool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
