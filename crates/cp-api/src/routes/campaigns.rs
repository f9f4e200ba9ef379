//! Campaign listing and question retrieval routes.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use cp_core::db::create_campaign_repository;
use cp_core::feedback::QuestionForm;
use cp_core::{Campaign, CampaignKind};

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Campaign information returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            created_at: campaign.created_at,
        }
    }
}

/// The question set for one campaign kind.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampaignQuestionsResponse {
    /// Campaign kind the questions belong to ("faculty", "curriculum", "guest").
    pub kind: String,
    pub questions: Vec<QuestionForm>,
}

/// Creates the campaign routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_campaigns))
        .route("/:kind/questions", get(campaign_questions))
}

/// Lists all campaigns.
#[utoipa::path(
    get,
    path = "/api/v1/campaigns",
    tag = "campaigns",
    responses(
        (status = 200, description = "List of campaigns", body = Vec<CampaignResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
async fn list_campaigns(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> Result<Json<Vec<CampaignResponse>>, ApiError> {
    let repo = create_campaign_repository(&state.db);
    let campaigns = repo.list().await?;

    Ok(Json(
        campaigns.into_iter().map(CampaignResponse::from).collect(),
    ))
}

/// Returns the question set for a campaign kind.
///
/// Serves the stored questions when a campaign of that kind exists and has
/// any; otherwise falls back to the built-in defaults so forms can render
/// before a campaign has been provisioned.
#[utoipa::path(
    get,
    path = "/api/v1/campaigns/{kind}/questions",
    tag = "campaigns",
    params(
        ("kind" = String, Path, description = "Campaign kind: faculty, curriculum, or guest")
    ),
    responses(
        (status = 200, description = "Questions for the campaign kind", body = CampaignQuestionsResponse),
        (status = 400, description = "Unknown campaign kind"),
        (status = 401, description = "Not authenticated")
    )
)]
async fn campaign_questions(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
    Path(kind): Path<String>,
) -> Result<Json<CampaignQuestionsResponse>, ApiError> {
    let kind = CampaignKind::from_str(&kind)
        .map_err(|_| ApiError::BadRequest(format!("Unknown campaign kind: {}", kind)))?;

    let repo = create_campaign_repository(&state.db);

    let mut questions: Vec<QuestionForm> = Vec::new();
    if let Some(campaign) = repo.find_by_name_fragment(kind.name_fragment()).await? {
        questions = repo
            .list_questions(campaign.id)
            .await?
            .iter()
            .map(QuestionForm::from)
            .collect();
    }

    if questions.is_empty() {
        questions = kind.default_question_forms();
    }

    Ok(Json(CampaignQuestionsResponse {
        kind: kind.as_str().to_string(),
        questions,
    }))
}

/// A rating answer required to be present and in range.
pub(crate) fn required_rating(
    answers: &std::collections::HashMap<String, serde_json::Value>,
    key: &str,
) -> Result<i64, ApiError> {
    use cp_core::feedback::{RATING_MAX, RATING_MIN};

    let value = answers.get(key).ok_or_else(|| {
        ApiError::validation_field(
            format!("answers.{}", key),
            "required",
            format!("An answer for {} is required", key),
        )
    })?;
    rating_answer(value)
        .filter(|r| (RATING_MIN..=RATING_MAX).contains(r))
        .ok_or_else(|| {
            ApiError::validation_field(
                format!("answers.{}", key),
                "out_of_range",
                format!("Ratings must be between {} and {}", RATING_MIN, RATING_MAX),
            )
        })
}

/// Accepts ratings sent as JSON numbers or numeric strings.
pub(crate) fn rating_answer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty trimmed text, `None` otherwise.
pub(crate) fn text_answer(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// Finds the campaign row for a kind, or reports the service as not ready.
pub(crate) async fn campaign_for_kind(
    state: &AppState,
    kind: CampaignKind,
) -> Result<Campaign, ApiError> {
    let repo = create_campaign_repository(&state.db);
    repo.find_by_name_fragment(kind.name_fragment())
        .await?
        .ok_or_else(|| {
            ApiError::ServiceUnavailable(format!("{} campaign is not configured", kind.title()))
        })
}

/// Loads a campaign's questions, materializing the defaults on first use.
///
/// Submissions reference question rows by id, so a campaign that has never
/// stored its questions gets the default set written before the first
/// submission is accepted.
pub(crate) async fn load_or_seed_questions(
    state: &AppState,
    campaign: &Campaign,
    kind: CampaignKind,
) -> Result<Vec<cp_core::Question>, ApiError> {
    let repo = create_campaign_repository(&state.db);

    let stored = repo.list_questions(campaign.id).await?;
    if !stored.is_empty() {
        return Ok(stored);
    }

    let mut questions = Vec::new();
    for (position, (text, question_kind)) in kind.default_questions().into_iter().enumerate() {
        let question =
            cp_core::Question::new(campaign.id, (position + 1) as i32, &text, question_kind);
        questions.push(repo.add_question(&question).await?);
    }

    Ok(questions)
}
