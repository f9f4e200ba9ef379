//! Faculty repository for database operations.
//!
//! The branch a faculty member belongs to lives on their user row, so
//! branch-scoped queries join `users`.

use super::{DbError, DbPool};
use crate::academics::Faculty;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for faculty records.
#[async_trait]
pub trait FacultyRepository: Send + Sync {
    /// Creates a new faculty record.
    async fn create(&self, faculty: &Faculty) -> Result<Faculty, DbError>;

    /// Gets a faculty member by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Faculty>, DbError>;

    /// Gets the faculty record behind a user account.
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Faculty>, DbError>;

    /// Gets a faculty member by email.
    async fn get_by_email(&self, email: &str) -> Result<Option<Faculty>, DbError>;

    /// Lists all faculty, ordered by name.
    async fn list(&self) -> Result<Vec<Faculty>, DbError>;

    /// Counts faculty whose user account is scoped to a branch.
    async fn count_by_branch(&self, branch: &str) -> Result<u64, DbError>;
}

/// SQLite implementation of FacultyRepository.
#[cfg(feature = "database")]
pub struct SqliteFacultyRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteFacultyRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl FacultyRepository for SqliteFacultyRepository {
    async fn create(&self, faculty: &Faculty) -> Result<Faculty, DbError> {
        sqlx::query(
            r#"
            INSERT INTO faculty (id, name, email, department, user_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(faculty.id.to_string())
        .bind(&faculty.name)
        .bind(&faculty.email)
        .bind(&faculty.department)
        .bind(faculty.user_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(faculty.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Faculty>, DbError> {
        let row: Option<SqliteFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Faculty>, DbError> {
        let row: Option<SqliteFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Faculty>, DbError> {
        let row: Option<SqliteFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Faculty>, DbError> {
        let rows: Vec<SqliteFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_by_branch(&self, branch: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM faculty f JOIN users u ON f.user_id = u.id WHERE u.branch = ?",
        )
        .bind(branch)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

/// PostgreSQL implementation of FacultyRepository.
#[cfg(feature = "database")]
pub struct PgFacultyRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgFacultyRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl FacultyRepository for PgFacultyRepository {
    async fn create(&self, faculty: &Faculty) -> Result<Faculty, DbError> {
        sqlx::query(
            r#"
            INSERT INTO faculty (id, name, email, department, user_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(faculty.id)
        .bind(&faculty.name)
        .bind(&faculty.email)
        .bind(&faculty.department)
        .bind(faculty.user_id)
        .execute(&self.pool)
        .await?;

        Ok(faculty.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Faculty>, DbError> {
        let row: Option<PgFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Faculty>, DbError> {
        let row: Option<PgFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Faculty>, DbError> {
        let row: Option<PgFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Faculty>, DbError> {
        let rows: Vec<PgFacultyRow> = sqlx::query_as(
            "SELECT id, name, email, department, user_id FROM faculty ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_branch(&self, branch: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM faculty f JOIN users u ON f.user_id = u.id WHERE u.branch = $1",
        )
        .bind(branch)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_faculty_repository(pool: &DbPool) -> Box<dyn FacultyRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteFacultyRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgFacultyRepository::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_faculty_repository(_pool: &DbPool) -> Box<dyn FacultyRepository> {
    panic!("Database support not enabled. Compile with --features database")
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteFacultyRow {
    id: String,
    name: String,
    email: String,
    department: String,
    user_id: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteFacultyRow> for Faculty {
    type Error = DbError;

    fn try_from(row: SqliteFacultyRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;
        let user_id = Uuid::parse_str(&row.user_id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;

        Ok(Faculty {
            id,
            name: row.name,
            email: row.email,
            department: row.department,
            user_id,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgFacultyRow {
    id: Uuid,
    name: String,
    email: String,
    department: String,
    user_id: Uuid,
}

#[cfg(feature = "database")]
impl From<PgFacultyRow> for Faculty {
    fn from(row: PgFacultyRow) -> Self {
        Faculty {
            id: row.id,
            name: row.name,
            email: row.email,
            department: row.department,
            user_id: row.user_id,
        }
    }
}
