//! Database-backed visibility flag stores.

use super::DbPool;
use crate::visibility::{VisibilityError, VisibilityFlag, VisibilityStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Converts an sqlx error to a VisibilityError.
#[cfg(feature = "database")]
fn sqlx_to_visibility_error(err: sqlx::Error) -> VisibilityError {
    VisibilityError::Storage(err.to_string())
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

/// PostgreSQL implementation of VisibilityStore.
#[cfg(feature = "database")]
pub struct PostgresVisibilityStore {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PostgresVisibilityStore {
    /// Creates a new PostgreSQL visibility store.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgVisibilityRow {
    name: String,
    enabled: bool,
    updated_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgVisibilityRow> for VisibilityFlag {
    fn from(row: PgVisibilityRow) -> Self {
        VisibilityFlag {
            name: row.name,
            enabled: row.enabled,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl VisibilityStore for PostgresVisibilityStore {
    async fn list(&self) -> Result<Vec<VisibilityFlag>, VisibilityError> {
        let rows: Vec<PgVisibilityRow> = sqlx::query_as(
            "SELECT name, enabled, updated_at FROM visibility_flags ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_to_visibility_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, name: &str) -> Result<Option<VisibilityFlag>, VisibilityError> {
        let row: Option<PgVisibilityRow> = sqlx::query_as(
            "SELECT name, enabled, updated_at FROM visibility_flags WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_to_visibility_error)?;

        Ok(row.map(Into::into))
    }

    async fn upsert(&self, flag: &VisibilityFlag) -> Result<(), VisibilityError> {
        sqlx::query(
            r#"
            INSERT INTO visibility_flags (name, enabled, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (name) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                updated_at = NOW()
            "#,
        )
        .bind(&flag.name)
        .bind(flag.enabled)
        .execute(&self.pool)
        .await
        .map_err(sqlx_to_visibility_error)?;

        Ok(())
    }
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of VisibilityStore.
#[cfg(feature = "database")]
pub struct SqliteVisibilityStore {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteVisibilityStore {
    /// Creates a new SQLite visibility store.
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteVisibilityRow {
    name: String,
    enabled: i32, // SQLite stores booleans as integers
    updated_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteVisibilityRow> for VisibilityFlag {
    type Error = VisibilityError;

    fn try_from(row: SqliteVisibilityRow) -> Result<Self, Self::Error> {
        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                // The migration seeds defaults with datetime('now'), which
                // uses this format.
                chrono::NaiveDateTime::parse_from_str(&row.updated_at, "%Y-%m-%d %H:%M:%S")
                    .map(|dt| dt.and_utc())
            })
            .map_err(|e| VisibilityError::Storage(format!("Failed to parse updated_at: {}", e)))?;

        Ok(VisibilityFlag {
            name: row.name,
            enabled: row.enabled != 0,
            updated_at,
        })
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl VisibilityStore for SqliteVisibilityStore {
    async fn list(&self) -> Result<Vec<VisibilityFlag>, VisibilityError> {
        let rows: Vec<SqliteVisibilityRow> = sqlx::query_as(
            "SELECT name, enabled, updated_at FROM visibility_flags ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_to_visibility_error)?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn get(&self, name: &str) -> Result<Option<VisibilityFlag>, VisibilityError> {
        let row: Option<SqliteVisibilityRow> = sqlx::query_as(
            "SELECT name, enabled, updated_at FROM visibility_flags WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_to_visibility_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, flag: &VisibilityFlag) -> Result<(), VisibilityError> {
        let enabled = if flag.enabled { 1 } else { 0 };
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO visibility_flags (name, enabled, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&flag.name)
        .bind(enabled)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(sqlx_to_visibility_error)?;

        Ok(())
    }
}

// ============================================================================
// Factory Function
// ============================================================================

/// Factory function to create the appropriate VisibilityStore based on pool type.
#[cfg(feature = "database")]
pub fn create_visibility_store(pool: &DbPool) -> Box<dyn VisibilityStore> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteVisibilityStore::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PostgresVisibilityStore::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_visibility_store(_pool: &DbPool) -> Box<dyn VisibilityStore> {
    panic!("Database support not enabled. Compile with --features database")
}

// ============================================================================
// Tests
// ============================================================================
