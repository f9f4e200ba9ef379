//! Feedback entry repository.
//!
//! Entries are soft-validated: analytics and exports only ever read rows
//! with `valid` set, and `revalidate_for_student` flips invalidated rows
//! back without touching their answers.

use super::{DbError, DbPool};
use crate::feedback::FeedbackEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for feedback entries.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Inserts a batch of entries atomically.
    ///
    /// One submission produces one entry per answered question; either the
    /// whole questionnaire lands or none of it does.
    async fn insert_entries(&self, entries: &[FeedbackEntry]) -> Result<u64, DbError>;

    /// Counts a student's valid entries in a campaign.
    async fn count_valid_for_student(
        &self,
        campaign_id: Uuid,
        student_id: Uuid,
    ) -> Result<u64, DbError>;

    /// Lists all valid entries about a faculty member, oldest first.
    async fn list_valid_by_faculty(&self, faculty_id: Uuid)
        -> Result<Vec<FeedbackEntry>, DbError>;

    /// Lists valid entries from students of a branch in a campaign.
    async fn list_valid_for_branch_campaign(
        &self,
        campaign_id: Uuid,
        branch: &str,
    ) -> Result<Vec<FeedbackEntry>, DbError>;

    /// Student IDs from a branch with at least one valid entry in a campaign.
    async fn distinct_submitters(
        &self,
        campaign_id: Uuid,
        branch: &str,
    ) -> Result<Vec<Uuid>, DbError>;

    /// Restores a student's invalidated entries; returns how many changed.
    async fn revalidate_for_student(&self, student_id: Uuid) -> Result<u64, DbError>;
}

#[cfg(feature = "database")]
const ENTRY_COLUMNS: &str = "id, campaign_id, student_id, faculty_id, subject_id, question_id, answer, valid, submitted_at, respondent_id";

/// SQLite implementation of FeedbackRepository.
#[cfg(feature = "database")]
pub struct SqliteFeedbackRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteFeedbackRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl FeedbackRepository for SqliteFeedbackRepository {
    async fn insert_entries(&self, entries: &[FeedbackEntry]) -> Result<u64, DbError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO feedback_entries (id, campaign_id, student_id, faculty_id, subject_id, question_id, answer, valid, submitted_at, respondent_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id.to_string())
            .bind(entry.campaign_id.to_string())
            .bind(entry.student_id.map(|id| id.to_string()))
            .bind(entry.faculty_id.map(|id| id.to_string()))
            .bind(entry.subject_id.map(|id| id.to_string()))
            .bind(entry.question_id.to_string())
            .bind(&entry.answer)
            .bind(entry.valid)
            .bind(entry.submitted_at.to_rfc3339())
            .bind(entry.respondent_id.map(|id| id.to_string()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(entries.len() as u64)
    }

    async fn count_valid_for_student(
        &self,
        campaign_id: Uuid,
        student_id: Uuid,
    ) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM feedback_entries WHERE campaign_id = ? AND student_id = ? AND valid = 1",
        )
        .bind(campaign_id.to_string())
        .bind(student_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn list_valid_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<FeedbackEntry>, DbError> {
        let query = format!(
            "SELECT {} FROM feedback_entries WHERE faculty_id = ? AND valid = 1 ORDER BY submitted_at ASC",
            ENTRY_COLUMNS
        );
        let rows: Vec<SqliteEntryRow> = sqlx::query_as(&query)
            .bind(faculty_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_valid_for_branch_campaign(
        &self,
        campaign_id: Uuid,
        branch: &str,
    ) -> Result<Vec<FeedbackEntry>, DbError> {
        let query = format!(
            r#"
            SELECT fe.{}
            FROM feedback_entries fe
            JOIN students s ON fe.student_id = s.id
            WHERE fe.campaign_id = ? AND s.branch = ? AND fe.valid = 1
            ORDER BY fe.submitted_at ASC
            "#,
            ENTRY_COLUMNS.replace(", ", ", fe.")
        );
        let rows: Vec<SqliteEntryRow> = sqlx::query_as(&query)
            .bind(campaign_id.to_string())
            .bind(branch)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn distinct_submitters(
        &self,
        campaign_id: Uuid,
        branch: &str,
    ) -> Result<Vec<Uuid>, DbError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT fe.student_id
            FROM feedback_entries fe
            JOIN students s ON fe.student_id = s.id
            WHERE fe.campaign_id = ? AND s.branch = ? AND fe.valid = 1
            "#,
        )
        .bind(campaign_id.to_string())
        .bind(branch)
        .fetch_all(&self.pool)
        .await?;

        ids.iter().map(|id| parse_uuid(id)).collect()
    }

    async fn revalidate_for_student(&self, student_id: Uuid) -> Result<u64, DbError> {
        let result =
            sqlx::query("UPDATE feedback_entries SET valid = 1 WHERE student_id = ? AND valid = 0")
                .bind(student_id.to_string())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

/// PostgreSQL implementation of FeedbackRepository.
#[cfg(feature = "database")]
pub struct PgFeedbackRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgFeedbackRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl FeedbackRepository for PgFeedbackRepository {
    async fn insert_entries(&self, entries: &[FeedbackEntry]) -> Result<u64, DbError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO feedback_entries (id, campaign_id, student_id, faculty_id, subject_id, question_id, answer, valid, submitted_at, respondent_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(entry.id)
            .bind(entry.campaign_id)
            .bind(entry.student_id)
            .bind(entry.faculty_id)
            .bind(entry.subject_id)
            .bind(entry.question_id)
            .bind(&entry.answer)
            .bind(entry.valid)
            .bind(entry.submitted_at)
            .bind(entry.respondent_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(entries.len() as u64)
    }

    async fn count_valid_for_student(
        &self,
        campaign_id: Uuid,
        student_id: Uuid,
    ) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM feedback_entries WHERE campaign_id = $1 AND student_id = $2 AND valid = TRUE",
        )
        .bind(campaign_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn list_valid_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<FeedbackEntry>, DbError> {
        let query = format!(
            "SELECT {} FROM feedback_entries WHERE faculty_id = $1 AND valid = TRUE ORDER BY submitted_at ASC",
            ENTRY_COLUMNS
        );
        let rows: Vec<PgEntryRow> = sqlx::query_as(&query)
            .bind(faculty_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_valid_for_branch_campaign(
        &self,
        campaign_id: Uuid,
        branch: &str,
    ) -> Result<Vec<FeedbackEntry>, DbError> {
        let query = format!(
            r#"
            SELECT fe.{}
            FROM feedback_entries fe
            JOIN students s ON fe.student_id = s.id
            WHERE fe.campaign_id = $1 AND s.branch = $2 AND fe.valid = TRUE
            ORDER BY fe.submitted_at ASC
            "#,
            ENTRY_COLUMNS.replace(", ", ", fe.")
        );
        let rows: Vec<PgEntryRow> = sqlx::query_as(&query)
            .bind(campaign_id)
            .bind(branch)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn distinct_submitters(
        &self,
        campaign_id: Uuid,
        branch: &str,
    ) -> Result<Vec<Uuid>, DbError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT fe.student_id
            FROM feedback_entries fe
            JOIN students s ON fe.student_id = s.id
            WHERE fe.campaign_id = $1 AND s.branch = $2 AND fe.valid = TRUE
            "#,
        )
        .bind(campaign_id)
        .bind(branch)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn revalidate_for_student(&self, student_id: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE feedback_entries SET valid = TRUE WHERE student_id = $1 AND valid = FALSE",
        )
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_feedback_repository(pool: &DbPool) -> Box<dyn FeedbackRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteFeedbackRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgFeedbackRepository::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_feedback_repository(_pool: &DbPool) -> Box<dyn FeedbackRepository> {
    panic!("Database support not enabled. Compile with --features database")
}

// Helper structs for SQLx row mapping

#[cfg(feature = "database")]
fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))
}

#[cfg(feature = "database")]
fn parse_opt_uuid(value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(parse_uuid).transpose()
}

#[cfg(feature = "database")]
fn parse_sqlite_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
        })
        .map_err(|e| DbError::Serialization(format!("Invalid timestamp: {}", e)))
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteEntryRow {
    id: String,
    campaign_id: String,
    student_id: Option<String>,
    faculty_id: Option<String>,
    subject_id: Option<String>,
    question_id: String,
    answer: String,
    valid: bool,
    submitted_at: String,
    respondent_id: Option<String>,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteEntryRow> for FeedbackEntry {
    type Error = DbError;

    fn try_from(row: SqliteEntryRow) -> Result<Self, Self::Error> {
        Ok(FeedbackEntry {
            id: parse_uuid(&row.id)?,
            campaign_id: parse_uuid(&row.campaign_id)?,
            student_id: parse_opt_uuid(row.student_id.as_deref())?,
            faculty_id: parse_opt_uuid(row.faculty_id.as_deref())?,
            subject_id: parse_opt_uuid(row.subject_id.as_deref())?,
            question_id: parse_uuid(&row.question_id)?,
            answer: row.answer,
            valid: row.valid,
            submitted_at: parse_sqlite_timestamp(&row.submitted_at)?,
            respondent_id: parse_opt_uuid(row.respondent_id.as_deref())?,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgEntryRow {
    id: Uuid,
    campaign_id: Uuid,
    student_id: Option<Uuid>,
    faculty_id: Option<Uuid>,
    subject_id: Option<Uuid>,
    question_id: Uuid,
    answer: String,
    valid: bool,
    submitted_at: DateTime<Utc>,
    respondent_id: Option<Uuid>,
}

#[cfg(feature = "database")]
impl From<PgEntryRow> for FeedbackEntry {
    fn from(row: PgEntryRow) -> Self {
        FeedbackEntry {
            id: row.id,
            campaign_id: row.campaign_id,
            student_id: row.student_id,
            faculty_id: row.faculty_id,
            subject_id: row.subject_id,
            question_id: row.question_id,
            answer: row.answer,
            valid: row.valid,
            submitted_at: row.submitted_at,
            respondent_id: row.respondent_id,
        }
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;

    fn sample_row() -> SqliteEntryRow {
        SqliteEntryRow {
            id: Uuid::new_v4().to_string(),
            campaign_id: Uuid::new_v4().to_string(),
            student_id: Some(Uuid::new_v4().to_string()),
            faculty_id: Some(Uuid::new_v4().to_string()),
            subject_id: Some(Uuid::new_v4().to_string()),
            question_id: Uuid::new_v4().to_string(),
            answer: "5".to_string(),
            valid: true,
            submitted_at: Utc::now().to_rfc3339(),
            respondent_id: None,
        }
    }

    #[test]
    fn test_entry_row_conversion() {
        let entry: FeedbackEntry = sample_row().try_into().unwrap();
        assert_eq!(entry.answer, "5");
        assert!(entry.valid);
        assert!(entry.student_id.is_some());
        assert!(entry.respondent_id.is_none());
    }

    #[test]
    fn test_entry_row_guest_shape() {
        let mut row = sample_row();
        row.student_id = None;
        row.subject_id = None;
        row.respondent_id = Some(Uuid::new_v4().to_string());

        let entry: FeedbackEntry = row.try_into().unwrap();
        assert!(entry.student_id.is_none());
        assert!(entry.faculty_id.is_some());
        assert!(entry.respondent_id.is_some());
    }

    #[test]
    fn test_entry_row_rejects_bad_optional_uuid() {
        let mut row = sample_row();
        row.student_id = Some("garbage".to_string());

        let result: Result<FeedbackEntry, DbError> = row.try_into();
        assert!(matches!(result, Err(DbError::Serialization(_))));
    }

    #[test]
    fn test_entry_columns_qualify_cleanly() {
        let qualified = format!("fe.{}", ENTRY_COLUMNS.replace(", ", ", fe."));
        assert!(qualified.starts_with("fe.id, fe.campaign_id"));
        assert!(qualified.ends_with("fe.respondent_id"));
    }
}
