//! Student repository for database operations.

use super::{DbError, DbPool};
use crate::academics::Student;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for student records.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Creates a new student record.
    async fn create(&self, student: &Student) -> Result<Student, DbError>;

    /// Gets a student by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Student>, DbError>;

    /// Gets the student record behind a user account.
    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Student>, DbError>;

    /// Gets a student by PRN.
    async fn get_by_prn(&self, prn: &str) -> Result<Option<Student>, DbError>;

    /// Lists all students in a branch, ordered by PRN.
    async fn list_by_branch(&self, branch: &str) -> Result<Vec<Student>, DbError>;

    /// Counts students in a branch.
    async fn count_by_branch(&self, branch: &str) -> Result<u64, DbError>;
}

#[cfg(feature = "database")]
const SELECT_COLUMNS: &str = "id, prn, name, email, branch, semester, user_id";

/// SQLite implementation of StudentRepository.
#[cfg(feature = "database")]
pub struct SqliteStudentRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteStudentRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl StudentRepository for SqliteStudentRepository {
    async fn create(&self, student: &Student) -> Result<Student, DbError> {
        sqlx::query(
            r#"
            INSERT INTO students (id, prn, name, email, branch, semester, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student.id.to_string())
        .bind(&student.prn)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.branch)
        .bind(student.semester)
        .bind(student.user_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(student.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Student>, DbError> {
        let query = format!("SELECT {} FROM students WHERE id = ?", SELECT_COLUMNS);
        let row: Option<SqliteStudentRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Student>, DbError> {
        let query = format!("SELECT {} FROM students WHERE user_id = ?", SELECT_COLUMNS);
        let row: Option<SqliteStudentRow> = sqlx::query_as(&query)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_prn(&self, prn: &str) -> Result<Option<Student>, DbError> {
        let query = format!("SELECT {} FROM students WHERE prn = ?", SELECT_COLUMNS);
        let row: Option<SqliteStudentRow> = sqlx::query_as(&query)
            .bind(prn)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_branch(&self, branch: &str) -> Result<Vec<Student>, DbError> {
        let query = format!(
            "SELECT {} FROM students WHERE branch = ? ORDER BY prn ASC",
            SELECT_COLUMNS
        );
        let rows: Vec<SqliteStudentRow> = sqlx::query_as(&query)
            .bind(branch)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_by_branch(&self, branch: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE branch = ?")
            .bind(branch)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// PostgreSQL implementation of StudentRepository.
#[cfg(feature = "database")]
pub struct PgStudentRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgStudentRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl StudentRepository for PgStudentRepository {
    async fn create(&self, student: &Student) -> Result<Student, DbError> {
        sqlx::query(
            r#"
            INSERT INTO students (id, prn, name, email, branch, semester, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(student.id)
        .bind(&student.prn)
        .bind(&student.name)
        .bind(&student.email)
        .bind(&student.branch)
        .bind(student.semester)
        .bind(student.user_id)
        .execute(&self.pool)
        .await?;

        Ok(student.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Student>, DbError> {
        let query = format!("SELECT {} FROM students WHERE id = $1", SELECT_COLUMNS);
        let row: Option<PgStudentRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_user(&self, user_id: Uuid) -> Result<Option<Student>, DbError> {
        let query = format!("SELECT {} FROM students WHERE user_id = $1", SELECT_COLUMNS);
        let row: Option<PgStudentRow> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_prn(&self, prn: &str) -> Result<Option<Student>, DbError> {
        let query = format!("SELECT {} FROM students WHERE prn = $1", SELECT_COLUMNS);
        let row: Option<PgStudentRow> = sqlx::query_as(&query)
            .bind(prn)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_by_branch(&self, branch: &str) -> Result<Vec<Student>, DbError> {
        let query = format!(
            "SELECT {} FROM students WHERE branch = $1 ORDER BY prn ASC",
            SELECT_COLUMNS
        );
        let rows: Vec<PgStudentRow> = sqlx::query_as(&query)
            .bind(branch)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_branch(&self, branch: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE branch = $1")
            .bind(branch)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_student_repository(pool: &DbPool) -> Box<dyn StudentRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteStudentRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgStudentRepository::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_student_repository(_pool: &DbPool) -> Box<dyn StudentRepository> {
    panic!("Database support not enabled. Compile with --features database")
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteStudentRow {
    id: String,
    prn: String,
    name: String,
    email: String,
    branch: String,
    semester: i32,
    user_id: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteStudentRow> for Student {
    type Error = DbError;

    fn try_from(row: SqliteStudentRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;
        let user_id = Uuid::parse_str(&row.user_id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;

        Ok(Student {
            id,
            prn: row.prn,
            name: row.name,
            email: row.email,
            branch: row.branch,
            semester: row.semester,
            user_id,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgStudentRow {
    id: Uuid,
    prn: String,
    name: String,
    email: String,
    branch: String,
    semester: i32,
    user_id: Uuid,
}

#[cfg(feature = "database")]
impl From<PgStudentRow> for Student {
    fn from(row: PgStudentRow) -> Self {
        Student {
            id: row.id,
            prn: row.prn,
            name: row.name,
            email: row.email,
            branch: row.branch,
            semester: row.semester,
            user_id: row.user_id,
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_row_conversion() {
        let row = SqliteStudentRow {
            id: Uuid::new_v4().to_string(),
            prn: "PRNCSE101".to_string(),
            name: "Asha Rao".to_string(),
            email: "asha.rao.btech23@sitpune.edu.in".to_string(),
            branch: "CSE".to_string(),
            semester: 4,
            user_id: Uuid::new_v4().to_string(),
        };

        let student: Student = row.try_into().unwrap();
        assert_eq!(student.prn, "PRNCSE101");
        assert_eq!(student.branch, "CSE");
        assert_eq!(student.semester, 4);
    }

    #[test]
    fn test_sqlite_row_conversion_rejects_bad_uuid() {
        let row = SqliteStudentRow {
            id: "not-a-uuid".to_string(),
            prn: "PRNCSE101".to_string(),
            name: "Asha Rao".to_string(),
            email: "asha.rao.btech23@sitpune.edu.in".to_string(),
            branch: "CSE".to_string(),
            semester: 4,
            user_id: Uuid::new_v4().to_string(),
        };

        let result: Result<Student, DbError> = row.try_into();
        assert!(matches!(result, Err(DbError::Serialization(_))));
    }
}
