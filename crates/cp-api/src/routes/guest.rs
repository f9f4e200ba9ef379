//! Guest routes: guest-lecture feedback submission.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use cp_core::db::create_feedback_repository;
use cp_core::feedback::QuestionKind;
use cp_core::{CampaignKind, FeedbackEntry};
use cp_observability::{FEEDBACK_ENTRIES_TOTAL, FEEDBACK_SUBMISSIONS_TOTAL};

use crate::auth::RequireGuest;
use crate::error::ApiError;
use crate::routes::campaigns::{
    campaign_for_kind, load_or_seed_questions, required_rating, text_answer,
};
use crate::state::AppState;

/// A guest-lecture feedback submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GuestFeedbackRequest {
    /// Answers keyed by question position ("Q1" through "Qn").
    pub answers: HashMap<String, serde_json::Value>,
}

/// Submission acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GuestFeedbackResponse {
    pub entries_recorded: u64,
    pub message: String,
}

/// Creates the guest routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/feedback", post(submit_guest_feedback))
}

/// Accepts guest-lecture feedback from an external respondent.
///
/// Guests may submit more than once; each attended lecture is its own
/// questionnaire round.
#[utoipa::path(
    post,
    path = "/api/v1/guest/feedback",
    tag = "guest",
    request_body = GuestFeedbackRequest,
    responses(
        (status = 201, description = "Feedback recorded", body = GuestFeedbackResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a guest account"),
        (status = 422, description = "Answers missing or out of range"),
        (status = 503, description = "Campaign not configured")
    )
)]
async fn submit_guest_feedback(
    State(state): State<AppState>,
    RequireGuest(user): RequireGuest,
    Json(request): Json<GuestFeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = campaign_for_kind(&state, CampaignKind::GuestLecture).await?;
    let questions = load_or_seed_questions(&state, &campaign, CampaignKind::GuestLecture).await?;

    let mut entries = Vec::new();
    for question in &questions {
        let key = question.key();
        match question.kind {
            QuestionKind::Rating => {
                let rating = required_rating(&request.answers, &key)?;
                entries.push(FeedbackEntry::guest_response(
                    campaign.id,
                    user.id,
                    question.id,
                    &rating.to_string(),
                ));
            }
            QuestionKind::Text => {
                if let Some(text) = request.answers.get(&key).and_then(text_answer) {
                    entries.push(FeedbackEntry::guest_response(
                        campaign.id,
                        user.id,
                        question.id,
                        &text,
                    ));
                }
            }
        }
    }

    let feedback_repo = create_feedback_repository(&state.db);
    let inserted = feedback_repo.insert_entries(&entries).await?;

    counter!(FEEDBACK_SUBMISSIONS_TOTAL, "kind" => "guest").increment(1);
    counter!(FEEDBACK_ENTRIES_TOTAL, "kind" => "guest").increment(inserted);
    info!(
        respondent = %user.email,
        entries = inserted,
        "Guest lecture feedback submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(GuestFeedbackResponse {
            entries_recorded: inserted,
            message: "Feedback submitted. Thank you!".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::{inject_test_user, TestUser};
    use crate::test_helpers::{
        create_campaign_with_questions, create_test_state, create_test_user, unique_suffix,
    };
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware;
    use cp_core::Role;
    use tower::ServiceExt;

    /// A guest account persisted to the database, as any session-backed
    /// guest would be; `respondent_id` references `users(id)`.
    async fn persisted_guest(state: &AppState) -> TestUser {
        let email = format!("guest{}@example.com", unique_suffix());
        TestUser(create_test_user(state, &email, "Test Guest", Role::Guest).await)
    }

    fn guest_router(state: AppState, test_user: TestUser) -> Router {
        Router::new()
            .nest("/guest", routes())
            .layer(middleware::from_fn(move |req, next| {
                inject_test_user(test_user.clone(), req, next)
            }))
            .with_state(state)
    }

    async fn post_feedback(app: Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/guest/feedback")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("Failed to build request"),
            )
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn full_guest_answers() -> serde_json::Value {
        serde_json::json!({
            "answers": {
                "Q1": 5, "Q2": 4, "Q3": 5, "Q4": 4, "Q5": 5,
                "Q6": 4, "Q7": 5, "Q8": 5, "Q9": 4
            }
        })
    }

    #[tokio::test]
    async fn test_guest_feedback_records_entries() {
        let state = create_test_state().await;
        create_campaign_with_questions(&state, CampaignKind::GuestLecture).await;
        let guest = persisted_guest(&state).await;
        let app = guest_router(state, guest);

        let (status, body) = post_feedback(app, full_guest_answers()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entries_recorded"], 9);
    }

    #[tokio::test]
    async fn test_guest_feedback_allows_repeat_submissions() {
        let state = create_test_state().await;
        create_campaign_with_questions(&state, CampaignKind::GuestLecture).await;

        let guest = persisted_guest(&state).await;
        let (status, _) =
            post_feedback(guest_router(state.clone(), guest), full_guest_answers())
                .await;
        assert_eq!(status, StatusCode::CREATED);

        let guest = persisted_guest(&state).await;
        let (status, _) =
            post_feedback(guest_router(state, guest), full_guest_answers()).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_guest_feedback_requires_every_rating() {
        let state = create_test_state().await;
        create_campaign_with_questions(&state, CampaignKind::GuestLecture).await;
        let app = guest_router(state, TestUser::guest());

        let (status, body) =
            post_feedback(app, serde_json::json!({"answers": {"Q1": 5}})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_guest_feedback_seeds_default_questions() {
        let state = create_test_state().await;
        let repo = cp_core::db::create_campaign_repository(&state.db);
        let campaign = repo
            .create(&cp_core::Campaign::new("Guest Lecture Feedback 2025"))
            .await
            .expect("Failed to create campaign");
        let guest = persisted_guest(&state).await;
        let app = guest_router(state.clone(), guest);

        let (status, _) = post_feedback(app, full_guest_answers()).await;
        assert_eq!(status, StatusCode::CREATED);

        let questions = repo
            .list_questions(campaign.id)
            .await
            .expect("Failed to list questions");
        assert_eq!(questions.len(), 9);
    }

    #[tokio::test]
    async fn test_guest_feedback_forbidden_for_students() {
        let state = create_test_state().await;
        create_campaign_with_questions(&state, CampaignKind::GuestLecture).await;
        let app = guest_router(state, TestUser::student());

        let (status, body) = post_feedback(app, full_guest_answers()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }
}
