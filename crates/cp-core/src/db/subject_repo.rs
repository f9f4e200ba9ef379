//! Subject, teaching assignment and elective repository.

use super::{DbError, DbPool};
use crate::academics::{Elective, Subject, SubjectKind, TeachingAssignment};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository trait for subjects and who teaches or takes them.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Creates a new subject.
    async fn create(&self, subject: &Subject) -> Result<Subject, DbError>;

    /// Gets a subject by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Subject>, DbError>;

    /// Gets a subject by its (unique) name.
    async fn get_by_name(&self, name: &str) -> Result<Option<Subject>, DbError>;

    /// Lists all subjects, ordered by name.
    async fn list(&self) -> Result<Vec<Subject>, DbError>;

    /// Records that a faculty member teaches a subject to a batch.
    async fn create_assignment(
        &self,
        assignment: &TeachingAssignment,
    ) -> Result<TeachingAssignment, DbError>;

    /// Lists the assignments of one faculty member.
    async fn list_assignments_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<TeachingAssignment>, DbError>;

    /// Lists all assignments covering any of the given subjects.
    async fn list_assignments_for_subjects(
        &self,
        subject_ids: &[Uuid],
    ) -> Result<Vec<TeachingAssignment>, DbError>;

    /// Records an elective choice.
    async fn create_elective(&self, elective: &Elective) -> Result<Elective, DbError>;

    /// Lists the electives chosen by a student.
    async fn list_electives_by_student(&self, student_id: Uuid)
        -> Result<Vec<Elective>, DbError>;

    /// Counts distinct subjects taught by faculty of a branch.
    async fn count_subjects_taught_in_branch(&self, branch: &str) -> Result<u64, DbError>;
}

/// SQLite implementation of SubjectRepository.
#[cfg(feature = "database")]
pub struct SqliteSubjectRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteSubjectRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SubjectRepository for SqliteSubjectRepository {
    async fn create(&self, subject: &Subject) -> Result<Subject, DbError> {
        sqlx::query("INSERT INTO subjects (id, name, kind) VALUES (?, ?, ?)")
            .bind(subject.id.to_string())
            .bind(&subject.name)
            .bind(subject.kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(subject.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subject>, DbError> {
        let row: Option<SqliteSubjectRow> =
            sqlx::query_as("SELECT id, name, kind FROM subjects WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Subject>, DbError> {
        let row: Option<SqliteSubjectRow> =
            sqlx::query_as("SELECT id, name, kind FROM subjects WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Subject>, DbError> {
        let rows: Vec<SqliteSubjectRow> =
            sqlx::query_as("SELECT id, name, kind FROM subjects ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_assignment(
        &self,
        assignment: &TeachingAssignment,
    ) -> Result<TeachingAssignment, DbError> {
        sqlx::query(
            "INSERT INTO teaching_assignments (id, faculty_id, subject_id, batch) VALUES (?, ?, ?, ?)",
        )
        .bind(assignment.id.to_string())
        .bind(assignment.faculty_id.to_string())
        .bind(assignment.subject_id.to_string())
        .bind(&assignment.batch)
        .execute(&self.pool)
        .await?;

        Ok(assignment.clone())
    }

    async fn list_assignments_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<TeachingAssignment>, DbError> {
        let rows: Vec<SqliteAssignmentRow> = sqlx::query_as(
            "SELECT id, faculty_id, subject_id, batch FROM teaching_assignments WHERE faculty_id = ?",
        )
        .bind(faculty_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_assignments_for_subjects(
        &self,
        subject_ids: &[Uuid],
    ) -> Result<Vec<TeachingAssignment>, DbError> {
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }

        // SQLite has no array binding, so the IN list is expanded by hand.
        let placeholders = vec!["?"; subject_ids.len()].join(", ");
        let query = format!(
            "SELECT id, faculty_id, subject_id, batch FROM teaching_assignments WHERE subject_id IN ({})",
            placeholders
        );

        let mut sqlx_query = sqlx::query_as::<_, SqliteAssignmentRow>(&query);
        for subject_id in subject_ids {
            sqlx_query = sqlx_query.bind(subject_id.to_string());
        }

        let rows: Vec<SqliteAssignmentRow> = sqlx_query.fetch_all(&self.pool).await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_elective(&self, elective: &Elective) -> Result<Elective, DbError> {
        sqlx::query("INSERT INTO electives (id, student_id, subject_id) VALUES (?, ?, ?)")
            .bind(elective.id.to_string())
            .bind(elective.student_id.to_string())
            .bind(elective.subject_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(elective.clone())
    }

    async fn list_electives_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Elective>, DbError> {
        let rows: Vec<SqliteElectiveRow> = sqlx::query_as(
            "SELECT id, student_id, subject_id FROM electives WHERE student_id = ?",
        )
        .bind(student_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_subjects_taught_in_branch(&self, branch: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT ta.subject_id)
            FROM teaching_assignments ta
            JOIN faculty f ON ta.faculty_id = f.id
            JOIN users u ON f.user_id = u.id
            WHERE u.branch = ?
            "#,
        )
        .bind(branch)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

/// PostgreSQL implementation of SubjectRepository.
#[cfg(feature = "database")]
pub struct PgSubjectRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgSubjectRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl SubjectRepository for PgSubjectRepository {
    async fn create(&self, subject: &Subject) -> Result<Subject, DbError> {
        sqlx::query("INSERT INTO subjects (id, name, kind) VALUES ($1, $2, $3)")
            .bind(subject.id)
            .bind(&subject.name)
            .bind(subject.kind.as_str())
            .execute(&self.pool)
            .await?;

        Ok(subject.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subject>, DbError> {
        let row: Option<PgSubjectRow> =
            sqlx::query_as("SELECT id, name, kind FROM subjects WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Subject>, DbError> {
        let row: Option<PgSubjectRow> =
            sqlx::query_as("SELECT id, name, kind FROM subjects WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Subject>, DbError> {
        let rows: Vec<PgSubjectRow> =
            sqlx::query_as("SELECT id, name, kind FROM subjects ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_assignment(
        &self,
        assignment: &TeachingAssignment,
    ) -> Result<TeachingAssignment, DbError> {
        sqlx::query(
            "INSERT INTO teaching_assignments (id, faculty_id, subject_id, batch) VALUES ($1, $2, $3, $4)",
        )
        .bind(assignment.id)
        .bind(assignment.faculty_id)
        .bind(assignment.subject_id)
        .bind(&assignment.batch)
        .execute(&self.pool)
        .await?;

        Ok(assignment.clone())
    }

    async fn list_assignments_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<TeachingAssignment>, DbError> {
        let rows: Vec<PgAssignmentRow> = sqlx::query_as(
            "SELECT id, faculty_id, subject_id, batch FROM teaching_assignments WHERE faculty_id = $1",
        )
        .bind(faculty_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_assignments_for_subjects(
        &self,
        subject_ids: &[Uuid],
    ) -> Result<Vec<TeachingAssignment>, DbError> {
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<PgAssignmentRow> = sqlx::query_as(
            "SELECT id, faculty_id, subject_id, batch FROM teaching_assignments WHERE subject_id = ANY($1)",
        )
        .bind(subject_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_elective(&self, elective: &Elective) -> Result<Elective, DbError> {
        sqlx::query("INSERT INTO electives (id, student_id, subject_id) VALUES ($1, $2, $3)")
            .bind(elective.id)
            .bind(elective.student_id)
            .bind(elective.subject_id)
            .execute(&self.pool)
            .await?;

        Ok(elective.clone())
    }

    async fn list_electives_by_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Elective>, DbError> {
        let rows: Vec<PgElectiveRow> = sqlx::query_as(
            "SELECT id, student_id, subject_id FROM electives WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_subjects_taught_in_branch(&self, branch: &str) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT ta.subject_id)
            FROM teaching_assignments ta
            JOIN faculty f ON ta.faculty_id = f.id
            JOIN users u ON f.user_id = u.id
            WHERE u.branch = $1
            "#,
        )
        .bind(branch)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_subject_repository(pool: &DbPool) -> Box<dyn SubjectRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteSubjectRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgSubjectRepository::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_subject_repository(_pool: &DbPool) -> Box<dyn SubjectRepository> {
    panic!("Database support not enabled. Compile with --features database")
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteSubjectRow {
    id: String,
    name: String,
    kind: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteSubjectRow> for Subject {
    type Error = DbError;

    fn try_from(row: SqliteSubjectRow) -> Result<Self, Self::Error> {
        let id = parse_uuid(&row.id)?;
        let kind = row
            .kind
            .parse::<SubjectKind>()
            .map_err(|_| DbError::Serialization(format!("Invalid subject kind: {}", row.kind)))?;

        Ok(Subject {
            id,
            name: row.name,
            kind,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgSubjectRow {
    id: Uuid,
    name: String,
    kind: String,
}

#[cfg(feature = "database")]
impl TryFrom<PgSubjectRow> for Subject {
    type Error = DbError;

    fn try_from(row: PgSubjectRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<SubjectKind>()
            .map_err(|_| DbError::Serialization(format!("Invalid subject kind: {}", row.kind)))?;

        Ok(Subject {
            id: row.id,
            name: row.name,
            kind,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteAssignmentRow {
    id: String,
    faculty_id: String,
    subject_id: String,
    batch: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteAssignmentRow> for TeachingAssignment {
    type Error = DbError;

    fn try_from(row: SqliteAssignmentRow) -> Result<Self, Self::Error> {
        Ok(TeachingAssignment {
            id: parse_uuid(&row.id)?,
            faculty_id: parse_uuid(&row.faculty_id)?,
            subject_id: parse_uuid(&row.subject_id)?,
            batch: row.batch,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgAssignmentRow {
    id: Uuid,
    faculty_id: Uuid,
    subject_id: Uuid,
    batch: String,
}

#[cfg(feature = "database")]
impl From<PgAssignmentRow> for TeachingAssignment {
    fn from(row: PgAssignmentRow) -> Self {
        TeachingAssignment {
            id: row.id,
            faculty_id: row.faculty_id,
            subject_id: row.subject_id,
            batch: row.batch,
        }
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteElectiveRow {
    id: String,
    student_id: String,
    subject_id: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteElectiveRow> for Elective {
    type Error = DbError;

    fn try_from(row: SqliteElectiveRow) -> Result<Self, Self::Error> {
        Ok(Elective {
            id: parse_uuid(&row.id)?,
            student_id: parse_uuid(&row.student_id)?,
            subject_id: parse_uuid(&row.subject_id)?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgElectiveRow {
    id: Uuid,
    student_id: Uuid,
    subject_id: Uuid,
}

#[cfg(feature = "database")]
impl From<PgElectiveRow> for Elective {
    fn from(row: PgElectiveRow) -> Self {
        Elective {
            id: row.id,
            student_id: row.student_id,
            subject_id: row.subject_id,
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;

    #[test]
    fn test_subject_row_conversion() {
        let row = SqliteSubjectRow {
            id: Uuid::new_v4().to_string(),
            name: "Operating Systems".to_string(),
            kind: "theory".to_string(),
        };

        let subject: Subject = row.try_into().unwrap();
        assert_eq!(subject.name, "Operating Systems");
        assert_eq!(subject.kind, SubjectKind::Theory);
    }

    #[test]
    fn test_subject_row_conversion_rejects_bad_kind() {
        let row = SqliteSubjectRow {
            id: Uuid::new_v4().to_string(),
            name: "Operating Systems".to_string(),
            kind: "seminar".to_string(),
        };

        let result: Result<Subject, DbError> = row.try_into();
        assert!(matches!(result, Err(DbError::Serialization(_))));
    }

    #[test]
    fn test_assignment_row_conversion() {
        let row = SqliteAssignmentRow {
            id: Uuid::new_v4().to_string(),
            faculty_id: Uuid::new_v4().to_string(),
            subject_id: Uuid::new_v4().to_string(),
            batch: "B".to_string(),
        };

        let assignment: TeachingAssignment = row.try_into().unwrap();
        assert_eq!(assignment.batch, "B");
    }
}
