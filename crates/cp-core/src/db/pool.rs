//! Database connection pool management.

use super::DbError;
use std::time::Duration;

/// Escapes special characters in a search pattern for use in SQL LIKE clauses.
///
/// SQL LIKE patterns use `%` for any sequence of characters and `_` for any
/// single character; user input containing them must be escaped to match
/// literally.
///
/// # Example
///
/// ```
/// use cp_core::db::escape_like_pattern;
///
/// let escaped = escape_like_pattern("prn_100%");
/// assert_eq!(escaped, r"prn\_100\%");
///
/// // Use in a LIKE query:
/// // WHERE email LIKE '%' || $1 || '%' ESCAPE '\'
/// ```
pub fn escape_like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '%' | '_' | '[' | ']' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Creates a LIKE pattern that matches anywhere in the string.
///
/// # Example
///
/// ```
/// use cp_core::db::make_like_pattern;
///
/// let pattern = make_like_pattern("btech_23");
/// assert_eq!(pattern, r"%btech\_23%");
/// ```
pub fn make_like_pattern(search: &str) -> String {
    format!("%{}%", escape_like_pattern(search))
}

#[cfg(feature = "database")]
use sqlx::{Pool, Postgres, Sqlite};

/// Unified database pool that can work with SQLite or PostgreSQL.
#[cfg(feature = "database")]
pub enum DbPool {
    /// SQLite connection pool (for development/testing).
    Sqlite(Pool<Sqlite>),
    /// PostgreSQL connection pool (for production).
    Postgres(Pool<Postgres>),
}

#[cfg(not(feature = "database"))]
pub struct DbPool;

/// Options for creating a database connection pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Maximum time to wait for a connection.
    pub acquire_timeout: Duration,
    /// Maximum lifetime of a connection.
    pub max_lifetime: Option<Duration>,
    /// Idle timeout for connections.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        let max_connections = std::env::var("CP_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);

        let min_connections = std::env::var("CP_DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let acquire_timeout_secs = std::env::var("CP_DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            max_lifetime: Some(Duration::from_secs(1800)),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Creates a database connection pool from a database URL.
///
/// The URL scheme determines the database type:
/// - `sqlite://` or `sqlite:` for SQLite
/// - `postgres://` or `postgresql://` for PostgreSQL
#[cfg(feature = "database")]
pub async fn create_pool(database_url: &str) -> Result<DbPool, DbError> {
    create_pool_with_options(database_url, PoolOptions::default()).await
}

#[cfg(not(feature = "database"))]
pub async fn create_pool(_database_url: &str) -> Result<DbPool, DbError> {
    Err(DbError::Configuration(
        "Database support not enabled. Compile with --features database".to_string(),
    ))
}

/// Creates a database connection pool with custom options.
#[cfg(feature = "database")]
pub async fn create_pool_with_options(
    database_url: &str,
    options: PoolOptions,
) -> Result<DbPool, DbError> {
    use tracing::info;

    if database_url.starts_with("sqlite:") {
        info!("Creating SQLite connection pool");
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.acquire_timeout)
            .max_lifetime(options.max_lifetime)
            .idle_timeout(options.idle_timeout)
            .connect(database_url)
            .await?;
        Ok(DbPool::Sqlite(pool))
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Creating PostgreSQL connection pool");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.acquire_timeout)
            .max_lifetime(options.max_lifetime)
            .idle_timeout(options.idle_timeout)
            .connect(database_url)
            .await?;
        Ok(DbPool::Postgres(pool))
    } else {
        Err(DbError::Configuration(format!(
            "Unsupported database URL scheme. Expected sqlite:// or postgres://, got: {}",
            database_url.split(':').next().unwrap_or("unknown")
        )))
    }
}

#[cfg(not(feature = "database"))]
pub async fn create_pool_with_options(
    _database_url: &str,
    _options: PoolOptions,
) -> Result<DbPool, DbError> {
    Err(DbError::Configuration(
        "Database support not enabled. Compile with --features database".to_string(),
    ))
}

#[cfg(feature = "database")]
impl Clone for DbPool {
    fn clone(&self) -> Self {
        match self {
            DbPool::Sqlite(pool) => DbPool::Sqlite(pool.clone()),
            DbPool::Postgres(pool) => DbPool::Postgres(pool.clone()),
        }
    }
}

#[cfg(feature = "database")]
impl DbPool {
    /// Returns the database type as a string.
    pub fn db_type(&self) -> &'static str {
        match self {
            DbPool::Sqlite(_) => "sqlite",
            DbPool::Postgres(_) => "postgres",
        }
    }

    /// Checks if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        match self {
            DbPool::Sqlite(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
            DbPool::Postgres(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.is_ok(),
        }
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        match self {
            DbPool::Sqlite(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
        }
    }

    /// Returns pool statistics.
    pub fn pool_size(&self) -> u32 {
        match self {
            DbPool::Sqlite(pool) => pool.size(),
            DbPool::Postgres(pool) => pool.size(),
        }
    }

    /// Returns number of idle connections.
    pub fn idle_connections(&self) -> usize {
        match self {
            DbPool::Sqlite(pool) => pool.num_idle(),
            DbPool::Postgres(pool) => pool.num_idle(),
        }
    }
}
