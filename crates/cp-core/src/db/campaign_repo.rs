//! Campaign and question repository.

use super::{make_like_pattern, DbError, DbPool};
use crate::feedback::{Campaign, Question, QuestionKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for feedback campaigns and their questions.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Creates a new campaign.
    async fn create(&self, campaign: &Campaign) -> Result<Campaign, DbError>;

    /// Gets a campaign by ID.
    async fn get(&self, id: Uuid) -> Result<Option<Campaign>, DbError>;

    /// Finds the newest campaign whose name contains the given fragment.
    ///
    /// Campaign names carry an academic-year suffix ("Faculty Feedback
    /// 2025-26"), so lookups go by the stable fragment and prefer the most
    /// recently created match.
    async fn find_by_name_fragment(&self, fragment: &str) -> Result<Option<Campaign>, DbError>;

    /// Lists all campaigns, newest first.
    async fn list(&self) -> Result<Vec<Campaign>, DbError>;

    /// Adds a question to a campaign.
    async fn add_question(&self, question: &Question) -> Result<Question, DbError>;

    /// Lists a campaign's questions in position order.
    async fn list_questions(&self, campaign_id: Uuid) -> Result<Vec<Question>, DbError>;
}

/// SQLite implementation of CampaignRepository.
#[cfg(feature = "database")]
pub struct SqliteCampaignRepository {
    pool: sqlx::SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteCampaignRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl CampaignRepository for SqliteCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> Result<Campaign, DbError> {
        sqlx::query("INSERT INTO campaigns (id, name, created_at) VALUES (?, ?, ?)")
            .bind(campaign.id.to_string())
            .bind(&campaign.name)
            .bind(campaign.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(campaign.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Campaign>, DbError> {
        let row: Option<SqliteCampaignRow> =
            sqlx::query_as("SELECT id, name, created_at FROM campaigns WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_name_fragment(&self, fragment: &str) -> Result<Option<Campaign>, DbError> {
        let pattern = make_like_pattern(fragment);
        let row: Option<SqliteCampaignRow> = sqlx::query_as(
            "SELECT id, name, created_at FROM campaigns WHERE name LIKE ? ESCAPE '\\' ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&pattern)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> Result<Vec<Campaign>, DbError> {
        let rows: Vec<SqliteCampaignRow> =
            sqlx::query_as("SELECT id, name, created_at FROM campaigns ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add_question(&self, question: &Question) -> Result<Question, DbError> {
        sqlx::query(
            "INSERT INTO questions (id, campaign_id, position, text, kind) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(question.id.to_string())
        .bind(question.campaign_id.to_string())
        .bind(question.position)
        .bind(&question.text)
        .bind(question.kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(question.clone())
    }

    async fn list_questions(&self, campaign_id: Uuid) -> Result<Vec<Question>, DbError> {
        let rows: Vec<SqliteQuestionRow> = sqlx::query_as(
            "SELECT id, campaign_id, position, text, kind FROM questions WHERE campaign_id = ? ORDER BY position ASC",
        )
        .bind(campaign_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// PostgreSQL implementation of CampaignRepository.
#[cfg(feature = "database")]
pub struct PgCampaignRepository {
    pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl PgCampaignRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> Result<Campaign, DbError> {
        sqlx::query("INSERT INTO campaigns (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(campaign.id)
            .bind(&campaign.name)
            .bind(campaign.created_at)
            .execute(&self.pool)
            .await?;

        Ok(campaign.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Campaign>, DbError> {
        let row: Option<PgCampaignRow> =
            sqlx::query_as("SELECT id, name, created_at FROM campaigns WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_name_fragment(&self, fragment: &str) -> Result<Option<Campaign>, DbError> {
        let pattern = make_like_pattern(fragment);
        let row: Option<PgCampaignRow> = sqlx::query_as(
            "SELECT id, name, created_at FROM campaigns WHERE name ILIKE $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&pattern)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Campaign>, DbError> {
        let rows: Vec<PgCampaignRow> =
            sqlx::query_as("SELECT id, name, created_at FROM campaigns ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_question(&self, question: &Question) -> Result<Question, DbError> {
        sqlx::query(
            "INSERT INTO questions (id, campaign_id, position, text, kind) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(question.id)
        .bind(question.campaign_id)
        .bind(question.position)
        .bind(&question.text)
        .bind(question.kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(question.clone())
    }

    async fn list_questions(&self, campaign_id: Uuid) -> Result<Vec<Question>, DbError> {
        let rows: Vec<PgQuestionRow> = sqlx::query_as(
            "SELECT id, campaign_id, position, text, kind FROM questions WHERE campaign_id = $1 ORDER BY position ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Factory function to create the appropriate repository based on pool type.
#[cfg(feature = "database")]
pub fn create_campaign_repository(pool: &DbPool) -> Box<dyn CampaignRepository> {
    match pool {
        DbPool::Sqlite(pool) => Box::new(SqliteCampaignRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Box::new(PgCampaignRepository::new(pool.clone())),
    }
}

#[cfg(not(feature = "database"))]
pub fn create_campaign_repository(_pool: &DbPool) -> Box<dyn CampaignRepository> {
    panic!("Database support not enabled. Compile with --features database")
}

// Helper structs for SQLx row mapping

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
struct SqliteCampaignRow {
    id: String,
    name: String,
    created_at: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteCampaignRow> for Campaign {
    type Error = DbError;

    fn try_from(row: SqliteCampaignRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;
        let created_at = parse_sqlite_timestamp(&row.created_at)?;

        Ok(Campaign {
            id,
            name: row.name,
            created_at,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgCampaignRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "database")]
impl From<PgCampaignRow> for Campaign {
    fn from(row: PgCampaignRow) -> Self {
        Campaign {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct SqliteQuestionRow {
    id: String,
    campaign_id: String,
    position: i32,
    text: String,
    kind: String,
}

#[cfg(feature = "database")]
impl TryFrom<SqliteQuestionRow> for Question {
    type Error = DbError;

    fn try_from(row: SqliteQuestionRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;
        let campaign_id = Uuid::parse_str(&row.campaign_id)
            .map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))?;
        let kind = row
            .kind
            .parse::<QuestionKind>()
            .map_err(|_| DbError::Serialization(format!("Invalid question kind: {}", row.kind)))?;

        Ok(Question {
            id,
            campaign_id,
            position: row.position,
            text: row.text,
            kind,
        })
    }
}

#[cfg(feature = "database")]
#[derive(sqlx::FromRow)]
struct PgQuestionRow {
    id: Uuid,
    campaign_id: Uuid,
    position: i32,
    text: String,
    kind: String,
}

#[cfg(feature = "database")]
impl TryFrom<PgQuestionRow> for Question {
    type Error = DbError;

    fn try_from(row: PgQuestionRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<QuestionKind>()
            .map_err(|_| DbError::Serialization(format!("Invalid question kind: {}", row.kind)))?;

        Ok(Question {
            id: row.id,
            campaign_id: row.campaign_id,
            position: row.position,
            text: row.text,
            kind,
        })
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_row_conversion() {
        let now = Utc::now();
        let row = SqliteCampaignRow {
            id: Uuid::new_v4().to_string(),
            name: "Faculty Feedback 2025-26".to_string(),
            created_at: now.to_rfc3339(),
        };

        let campaign: Campaign = row.try_into().unwrap();
        assert_eq!(campaign.name, "Faculty Feedback 2025-26");
    }

    #[test]
    fn test_campaign_row_accepts_sqlite_datetime() {
        let row = SqliteCampaignRow {
            id: Uuid::new_v4().to_string(),
            name: "Guest Lecture Feedback 2025-26".to_string(),
            created_at: "2025-07-14 08:00:00".to_string(),
        };

        let campaign: Campaign = row.try_into().unwrap();
        assert_eq!(campaign.created_at.to_rfc3339(), "2025-07-14T08:00:00+00:00");
    }

    #[test]
    fn test_question_row_conversion() {
        let row = SqliteQuestionRow {
            id: Uuid::new_v4().to_string(),
            campaign_id: Uuid::new_v4().to_string(),
            position: 3,
            text: "Syllabus was covered in depth?".to_string(),
            kind: "rating".to_string(),
        };

        let question: Question = row.try_into().unwrap();
        assert_eq!(question.position, 3);
        assert_eq!(question.key(), "Q3");
        assert_eq!(question.kind, QuestionKind::Rating);
    }
}
