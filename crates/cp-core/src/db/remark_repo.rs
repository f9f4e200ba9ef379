//! Remark repository.
//!
//! Free-text curriculum suggestions are kept separate from rating entries
//! so they can be listed and exported without scanning the answers table.

use super::{DbError, DbPool};
use crate::feedback::Remark;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for remarks.
#[async_trait]
pub trait RemarkRepository: Send + Sync {
    /// Stores a remark.
    async fn create(&self, remark: &Remark) -> Result<Remark, DbError>;

    /// Lists a branch's remarks, newest first.
    async fn list_by_branch(&self, branch: &str) -> Result<Vec<Remark>, DbError>;
}

/// SQLite implementation of RemarkRepository.
#[cfg(feature = "database")]
pub struct SqliteRemarkRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteRemarkRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl RemarkRepository for SqliteRemarkRepository {
    async fn create(&self, remark: &Remark) -> Result<Remark, DbError> {
        sqlx::query("INSERT INTO remarks (id, body, branch, submitted_at) VALUES (?, ?, ?, ?)")
            .bind(remark.id.to_string())
            .bind(&remark.body)
            .bind(&remark.branch)
            .bind(remark.submitted_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(remark.clone())
    }

    async fn list_by_branch(&self, branch: &str) -> Result<Vec<Remark>, DbError> {
        let rows: Vec<SqliteRemarkRow> = sqlx::query_as(
            "SELECT id, body, branch, submitted_at FROM remarks WHERE branch = ? ORDER BY submitted_at DESC",
        )
        .bind(branch)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// PostgreSQL implementation of RemarkRepository.
#[cfg(feature = "database")]
pub struct PgRemarkRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgRemarkRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl RemarkRepository for PgRemarkRepository {
    async fn create(&self, remark: &Remark) -> Result<Remark, DbError> {
        sqlx::query("INSERT INTO remarks (id, body, branch, submitted_at) VALUES ($1, $2, $3, $4)")
            .bind(remark.id)
            .bind(&remark.body)
            .bind(&remark.branch)
            .bind(remark.submitted_at)
            .execute(&self.pool)
            .await?;

        Ok(remark.clone())
    }

    async fn list_by_branch(&self, branch: &str) -> Result<Vec<Remark>, DbError> {
        let rows: Vec<PgRemarkRow> = sqlx::query_as(
            "SELECT id, body, branch, submitted_at FROM remarks WHERE branch = $1 ORDER BY submitted_at DESC",
        )
        .bind(branch)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_remark_repository(pool: &DbPool) -> Box<dyn RemarkRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteRemarkRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgRemarkRepository::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_remark_repository(_pool: &DbPool) -> Box<dyn RemarkRepository> {
    panic!("Database support not enabled. Compile with --features database")
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteRemarkRow {
    id: String,
    body: String,
    branch: String,
    submitted_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteRemarkRow> for Remark {
    type Error = DbError;

    fn try_from(row: SqliteRemarkRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;

        let submitted_at = DateTime::parse_from_rfc3339(&row.submitted_at)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| {
                chrono::NaiveDateTime::parse_from_str(&row.submitted_at, "%Y-%m-%d %H:%M:%S")
                    .map(|dt| dt.and_utc())
            })
            .map_err(|e| DbError::Serialization(format!("Invalid timestamp: {}", e)))?;

        Ok(Remark {
            id,
            body: row.body,
            branch: row.branch,
            submitted_at,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgRemarkRow {
    id: Uuid,
    body: String,
    branch: String,
    submitted_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgRemarkRow> for Remark {
    fn from(row: PgRemarkRow) -> Self {
        Remark {
            id: row.id,
            body: row.body,
            branch: row.branch,
            submitted_at: row.submitted_at,
        }
    }
}
