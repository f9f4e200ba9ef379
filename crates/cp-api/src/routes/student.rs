//! Student routes: profile, pending feedback targets, and submissions.

use std::collections::{HashMap, HashSet};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use cp_core::academics::Student;
use cp_core::db::{
    create_campaign_repository, create_faculty_repository, create_feedback_repository,
    create_remark_repository, create_student_repository, create_subject_repository,
};
use cp_core::feedback::{QuestionKind, RATING_MAX, RATING_MIN};
use cp_core::{CampaignKind, FeedbackEntry, Question, Remark, MAX_FEEDBACK_TARGETS};
use cp_observability::{FEEDBACK_ENTRIES_TOTAL, FEEDBACK_SUBMISSIONS_TOTAL};

use crate::auth::RequireStudent;
use crate::error::ApiError;
use crate::routes::campaigns::{
    campaign_for_kind, load_or_seed_questions, rating_answer, required_rating, text_answer,
};
use crate::state::AppState;

/// Department label used when a faculty record carries none.
const UNKNOWN_DEPARTMENT: &str = "Unknown Department";

/// The student's own academic record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StudentProfileResponse {
    pub id: Uuid,
    pub prn: String,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub semester: i32,
}

impl From<Student> for StudentProfileResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            prn: student.prn,
            name: student.name,
            email: student.email,
            branch: student.branch,
            semester: student.semester,
        }
    }
}

/// One faculty/subject pair awaiting the student's rating.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedbackTargetResponse {
    pub faculty_id: Uuid,
    pub faculty_name: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub department: String,
}

/// Ratings for one faculty/subject pair.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackTargetRequest {
    pub faculty_id: Uuid,
    pub subject_id: Uuid,
    /// Answers keyed by question position ("Q1" through "Qn").
    pub answers: HashMap<String, serde_json::Value>,
}

/// A full faculty feedback submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitFeedbackRequest {
    pub targets: Vec<FeedbackTargetRequest>,
    /// Optional anonymous remark recorded against the student's branch.
    #[serde(default)]
    pub remarks: Option<String>,
}

/// A curriculum feedback submission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CurriculumFeedbackRequest {
    pub answers: HashMap<String, serde_json::Value>,
}

/// Submission acknowledgement.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitFeedbackResponse {
    pub entries_recorded: u64,
    pub targets: usize,
    pub message: String,
}

/// Creates the student routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(student_profile))
        .route("/pending-feedback", get(pending_feedback))
        .route("/feedback", post(submit_feedback))
        .route("/curriculum-feedback", post(submit_curriculum_feedback))
}

/// Returns the signed-in student's academic record.
#[utoipa::path(
    get,
    path = "/api/v1/student/profile",
    tag = "student",
    responses(
        (status = 200, description = "Student profile", body = StudentProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a student"),
        (status = 404, description = "No student record for this account")
    )
)]
async fn student_profile(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
) -> Result<Json<StudentProfileResponse>, ApiError> {
    let student = student_record(&state, user.id).await?;
    Ok(Json(StudentProfileResponse::from(student)))
}

/// Lists the faculty/subject pairs the student still has to rate.
///
/// Serves the taught pairs plus the student's elective choices, capped at
/// the submission limit. Returns an empty list once the student has any
/// valid entry in the faculty campaign.
#[utoipa::path(
    get,
    path = "/api/v1/student/pending-feedback",
    tag = "student",
    responses(
        (status = 200, description = "Pending feedback targets", body = Vec<FeedbackTargetResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No student record for this account")
    )
)]
async fn pending_feedback(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
) -> Result<Json<Vec<FeedbackTargetResponse>>, ApiError> {
    let student = student_record(&state, user.id).await?;

    // Nothing is pending once a submission has landed
    let campaign_repo = create_campaign_repository(&state.db);
    if let Some(campaign) = campaign_repo
        .find_by_name_fragment(CampaignKind::Faculty.name_fragment())
        .await?
    {
        let feedback_repo = create_feedback_repository(&state.db);
        if feedback_repo
            .count_valid_for_student(campaign.id, student.id)
            .await?
            > 0
        {
            return Ok(Json(vec![]));
        }
    }

    let subject_repo = create_subject_repository(&state.db);
    let subjects = subject_repo.list().await?;
    let subject_ids: Vec<Uuid> = subjects.iter().map(|s| s.id).collect();
    let subject_names: HashMap<Uuid, String> =
        subjects.into_iter().map(|s| (s.id, s.name)).collect();

    let assignments = subject_repo
        .list_assignments_for_subjects(&subject_ids)
        .await?;
    let electives = subject_repo.list_electives_by_student(student.id).await?;

    let faculty_repo = create_faculty_repository(&state.db);
    let faculty_by_id: HashMap<Uuid, cp_core::Faculty> = faculty_repo
        .list()
        .await?
        .into_iter()
        .map(|f| (f.id, f))
        .collect();

    let mut seen: HashSet<(Uuid, Uuid)> = HashSet::new();
    let mut targets = Vec::new();

    let mut push_target = |faculty_id: Uuid, subject_id: Uuid| {
        if !seen.insert((faculty_id, subject_id)) {
            return;
        }
        let Some(faculty) = faculty_by_id.get(&faculty_id) else {
            return;
        };
        let Some(subject_name) = subject_names.get(&subject_id) else {
            return;
        };
        let department = if faculty.department.is_empty() {
            UNKNOWN_DEPARTMENT.to_string()
        } else {
            faculty.department.clone()
        };
        targets.push(FeedbackTargetResponse {
            faculty_id,
            faculty_name: faculty.name.clone(),
            subject_id,
            subject_name: subject_name.clone(),
            department,
        });
    };

    for assignment in &assignments {
        push_target(assignment.faculty_id, assignment.subject_id);
    }
    for elective in &electives {
        if let Some(assignment) = assignments
            .iter()
            .find(|a| a.subject_id == elective.subject_id)
        {
            push_target(assignment.faculty_id, assignment.subject_id);
        }
    }

    targets.truncate(MAX_FEEDBACK_TARGETS);

    Ok(Json(targets))
}

/// Accepts a faculty feedback submission.
#[utoipa::path(
    post,
    path = "/api/v1/student/feedback",
    tag = "student",
    request_body = SubmitFeedbackRequest,
    responses(
        (status = 201, description = "Feedback recorded", body = SubmitFeedbackResponse),
        (status = 400, description = "Missing or too many targets"),
        (status = 409, description = "Feedback already submitted"),
        (status = 422, description = "Answers missing or out of range"),
        (status = 503, description = "Campaign not configured")
    )
)]
async fn submit_feedback(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    Json(request): Json<SubmitFeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let student = student_record(&state, user.id).await?;

    if request.targets.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one feedback target is required".to_string(),
        ));
    }
    if request.targets.len() > MAX_FEEDBACK_TARGETS {
        return Err(ApiError::BadRequest(format!(
            "At most {} feedback targets are allowed",
            MAX_FEEDBACK_TARGETS
        )));
    }

    let campaign = campaign_for_kind(&state, CampaignKind::Faculty).await?;
    let questions = load_or_seed_questions(&state, &campaign, CampaignKind::Faculty).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    if feedback_repo
        .count_valid_for_student(campaign.id, student.id)
        .await?
        > 0
    {
        return Err(ApiError::Conflict(
            "Feedback has already been submitted".to_string(),
        ));
    }

    // Resolve every target before writing anything
    let faculty_repo = create_faculty_repository(&state.db);
    let subject_repo = create_subject_repository(&state.db);
    for (index, target) in request.targets.iter().enumerate() {
        if faculty_repo.get(target.faculty_id).await?.is_none() {
            return Err(ApiError::validation_field(
                format!("targets[{}].faculty_id", index),
                "unknown",
                "Unknown faculty member",
            ));
        }
        if subject_repo.get(target.subject_id).await?.is_none() {
            return Err(ApiError::validation_field(
                format!("targets[{}].subject_id", index),
                "unknown",
                "Unknown subject",
            ));
        }
    }

    let mut entries = Vec::new();
    for (index, target) in request.targets.iter().enumerate() {
        entries.extend(entries_for_target(
            campaign.id,
            student.id,
            index,
            target,
            &questions,
        )?);
    }

    let inserted = feedback_repo.insert_entries(&entries).await?;

    // Restore any rows a coordinator previously voided for this student
    let _ = feedback_repo.revalidate_for_student(student.id).await?;

    if let Some(remarks) = &request.remarks {
        let trimmed = remarks.trim();
        if !trimmed.is_empty() {
            let remark_repo = create_remark_repository(&state.db);
            remark_repo
                .create(&Remark::new(trimmed, &student.branch))
                .await?;
        }
    }

    counter!(FEEDBACK_SUBMISSIONS_TOTAL, "kind" => "faculty").increment(1);
    counter!(FEEDBACK_ENTRIES_TOTAL, "kind" => "faculty").increment(inserted);
    info!(
        student = %student.prn,
        branch = %student.branch,
        targets = request.targets.len(),
        entries = inserted,
        "Faculty feedback submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            entries_recorded: inserted,
            targets: request.targets.len(),
            message: "Feedback submitted. Thank you!".to_string(),
        }),
    ))
}

/// Accepts a curriculum feedback submission.
#[utoipa::path(
    post,
    path = "/api/v1/student/curriculum-feedback",
    tag = "student",
    request_body = CurriculumFeedbackRequest,
    responses(
        (status = 201, description = "Feedback recorded", body = SubmitFeedbackResponse),
        (status = 409, description = "Feedback already submitted"),
        (status = 422, description = "Answers missing or out of range"),
        (status = 503, description = "Campaign not configured")
    )
)]
async fn submit_curriculum_feedback(
    State(state): State<AppState>,
    RequireStudent(user): RequireStudent,
    Json(request): Json<CurriculumFeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let student = student_record(&state, user.id).await?;

    let campaign = campaign_for_kind(&state, CampaignKind::Curriculum).await?;
    let questions = load_or_seed_questions(&state, &campaign, CampaignKind::Curriculum).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    if feedback_repo
        .count_valid_for_student(campaign.id, student.id)
        .await?
        > 0
    {
        return Err(ApiError::Conflict(
            "Curriculum feedback has already been submitted".to_string(),
        ));
    }

    let mut entries = Vec::new();
    for question in &questions {
        let key = question.key();
        match question.kind {
            QuestionKind::Rating => {
                let rating = required_rating(&request.answers, &key)?;
                entries.push(FeedbackEntry::curriculum_response(
                    campaign.id,
                    student.id,
                    question.id,
                    &rating.to_string(),
                ));
            }
            QuestionKind::Text => {
                if let Some(text) = request.answers.get(&key).and_then(text_answer) {
                    entries.push(FeedbackEntry::curriculum_response(
                        campaign.id,
                        student.id,
                        question.id,
                        &text,
                    ));
                }
            }
        }
    }

    let inserted = feedback_repo.insert_entries(&entries).await?;

    counter!(FEEDBACK_SUBMISSIONS_TOTAL, "kind" => "curriculum").increment(1);
    counter!(FEEDBACK_ENTRIES_TOTAL, "kind" => "curriculum").increment(inserted);
    info!(
        student = %student.prn,
        branch = %student.branch,
        entries = inserted,
        "Curriculum feedback submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitFeedbackResponse {
            entries_recorded: inserted,
            targets: 0,
            message: "Curriculum feedback submitted. Thank you!".to_string(),
        }),
    ))
}

/// Looks up the student record behind an account.
async fn student_record(state: &AppState, user_id: Uuid) -> Result<Student, ApiError> {
    let repo = create_student_repository(&state.db);
    repo.get_by_user(user_id).await?.ok_or_else(|| {
        ApiError::NotFound("Student record not found for this account".to_string())
    })
}

/// Builds the entries for one target, validating every rating answer.
fn entries_for_target(
    campaign_id: Uuid,
    student_id: Uuid,
    target_index: usize,
    target: &FeedbackTargetRequest,
    questions: &[Question],
) -> Result<Vec<FeedbackEntry>, ApiError> {
    let mut entries = Vec::new();

    for question in questions {
        let key = question.key();
        match question.kind {
            QuestionKind::Rating => {
                let value = target.answers.get(&key).ok_or_else(|| {
                    ApiError::validation_field(
                        format!("targets[{}].answers.{}", target_index, key),
                        "required",
                        format!("An answer for {} is required", key),
                    )
                })?;
                let rating = rating_answer(value)
                    .filter(|r| (RATING_MIN..=RATING_MAX).contains(r))
                    .ok_or_else(|| {
                        ApiError::validation_field(
                            format!("targets[{}].answers.{}", target_index, key),
                            "out_of_range",
                            format!("Ratings must be between {} and {}", RATING_MIN, RATING_MAX),
                        )
                    })?;
                entries.push(FeedbackEntry::faculty_response(
                    campaign_id,
                    student_id,
                    target.faculty_id,
                    target.subject_id,
                    question.id,
                    &rating.to_string(),
                ));
            }
            QuestionKind::Text => {
                if let Some(text) = target.answers.get(&key).and_then(text_answer) {
                    entries.push(FeedbackEntry::faculty_response(
                        campaign_id,
                        student_id,
                        target.faculty_id,
                        target.subject_id,
                        question.id,
                        &text,
                    ));
                }
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::{inject_test_user, TestUser};
    use crate::test_helpers::{
        assign_subject, create_campaign_with_questions, create_test_faculty, create_test_state,
        create_test_student, create_test_subject,
    };
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware;
    use cp_core::User;
    use tower::ServiceExt;

    fn student_router(state: AppState, user: User) -> Router {
        Router::new()
            .nest("/student", routes())
            .layer(middleware::from_fn(move |req, next| {
                inject_test_user(TestUser(user.clone()), req, next)
            }))
            .with_state(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
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

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
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

    /// All nine faculty questions answered with in-range ratings.
    fn full_faculty_answers() -> serde_json::Value {
        serde_json::json!({
            "Q1": 5, "Q2": 4, "Q3": 5, "Q4": 3, "Q5": 5,
            "Q6": 4, "Q7": 5, "Q8": 4, "Q9": 5
        })
    }

    #[tokio::test]
    async fn test_profile_returns_student_record() {
        let state = create_test_state().await;
        let (user, student) = create_test_student(&state, "CSE", 5).await;
        let app = student_router(state, user);

        let (status, body) = get_json(app, "/student/profile").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prn"], student.prn);
        assert_eq!(body["branch"], "CSE");
        assert_eq!(body["semester"], 5);
    }

    #[tokio::test]
    async fn test_profile_without_student_record() {
        let state = create_test_state().await;
        let app = student_router(state, TestUser::student().0);

        let (status, body) = get_json(app, "/student/profile").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_pending_feedback_lists_taught_pairs() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        assign_subject(&state, faculty.id, subject.id, "A1").await;
        let app = student_router(state, user);

        let (status, body) = get_json(app, "/student/pending-feedback").await;
        assert_eq!(status, StatusCode::OK);
        let targets = body.as_array().expect("Expected array");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0]["faculty_name"], faculty.name);
        assert_eq!(targets[0]["subject_name"], "Operating Systems");
        assert_eq!(targets[0]["department"], "CSE");
    }

    #[tokio::test]
    async fn test_pending_feedback_caps_targets() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        for i in 0..7 {
            let subject = create_test_subject(&state, &format!("Subject {}", i)).await;
            assign_subject(&state, faculty.id, subject.id, "A1").await;
        }
        let app = student_router(state, user);

        let (status, body) = get_json(app, "/student/pending-feedback").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("Expected array").len(), MAX_FEEDBACK_TARGETS);
    }

    #[tokio::test]
    async fn test_submit_feedback_records_entries_and_remark() {
        let state = create_test_state().await;
        let (user, student) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        assign_subject(&state, faculty.id, subject.id, "A1").await;
        let (campaign, _) = create_campaign_with_questions(&state, CampaignKind::Faculty).await;
        let app = student_router(state.clone(), user);

        let (status, body) = post_json(
            app,
            "/student/feedback",
            serde_json::json!({
                "targets": [{
                    "faculty_id": faculty.id,
                    "subject_id": subject.id,
                    "answers": full_faculty_answers()
                }],
                "remarks": "  More lab hours please  "
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entries_recorded"], 9);

        let feedback_repo = create_feedback_repository(&state.db);
        let count = feedback_repo
            .count_valid_for_student(campaign.id, student.id)
            .await
            .expect("Count failed");
        assert_eq!(count, 9);

        let remark_repo = create_remark_repository(&state.db);
        let remarks = remark_repo
            .list_by_branch("CSE")
            .await
            .expect("List failed");
        assert_eq!(remarks.len(), 1);
        assert_eq!(remarks[0].body, "More lab hours please");
    }

    #[tokio::test]
    async fn test_submit_feedback_is_once_only() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        create_campaign_with_questions(&state, CampaignKind::Faculty).await;

        let request = serde_json::json!({
            "targets": [{
                "faculty_id": faculty.id,
                "subject_id": subject.id,
                "answers": full_faculty_answers()
            }]
        });

        let app = student_router(state.clone(), user.clone());
        let (status, _) = post_json(app, "/student/feedback", request.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let app = student_router(state, user);
        let (status, body) = post_json(app, "/student/feedback", request).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_submit_feedback_requires_every_rating() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        create_campaign_with_questions(&state, CampaignKind::Faculty).await;
        let app = student_router(state, user);

        let (status, body) = post_json(
            app,
            "/student/feedback",
            serde_json::json!({
                "targets": [{
                    "faculty_id": faculty.id,
                    "subject_id": subject.id,
                    "answers": {"Q1": 5, "Q2": 4}
                }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_submit_feedback_rejects_out_of_range_rating() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        create_campaign_with_questions(&state, CampaignKind::Faculty).await;
        let app = student_router(state, user);

        let mut answers = full_faculty_answers();
        answers["Q3"] = serde_json::json!(7);

        let (status, body) = post_json(
            app,
            "/student/feedback",
            serde_json::json!({
                "targets": [{
                    "faculty_id": faculty.id,
                    "subject_id": subject.id,
                    "answers": answers
                }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_submit_feedback_rejects_unknown_faculty() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        create_campaign_with_questions(&state, CampaignKind::Faculty).await;
        let app = student_router(state, user);

        let (status, body) = post_json(
            app,
            "/student/feedback",
            serde_json::json!({
                "targets": [{
                    "faculty_id": Uuid::new_v4(),
                    "subject_id": subject.id,
                    "answers": full_faculty_answers()
                }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_submit_feedback_without_targets() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        create_campaign_with_questions(&state, CampaignKind::Faculty).await;
        let app = student_router(state, user);

        let (status, body) =
            post_json(app, "/student/feedback", serde_json::json!({"targets": []})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_submit_feedback_without_campaign() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        let app = student_router(state, user);

        let (status, body) = post_json(
            app,
            "/student/feedback",
            serde_json::json!({
                "targets": [{
                    "faculty_id": faculty.id,
                    "subject_id": subject.id,
                    "answers": full_faculty_answers()
                }]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_curriculum_feedback_stores_text_answer() {
        let state = create_test_state().await;
        let (user, student) = create_test_student(&state, "AIML", 3).await;
        let (campaign, _) =
            create_campaign_with_questions(&state, CampaignKind::Curriculum).await;
        let app = student_router(state.clone(), user);

        let (status, body) = post_json(
            app,
            "/student/curriculum-feedback",
            serde_json::json!({
                "answers": {
                    "Q1": 4, "Q2": 5, "Q3": 4, "Q4": 3,
                    "Q5": "Add a course on distributed systems"
                }
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entries_recorded"], 5);

        let feedback_repo = create_feedback_repository(&state.db);
        let count = feedback_repo
            .count_valid_for_student(campaign.id, student.id)
            .await
            .expect("Count failed");
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_curriculum_feedback_text_is_optional() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "AIML", 3).await;
        create_campaign_with_questions(&state, CampaignKind::Curriculum).await;
        let app = student_router(state, user);

        let (status, body) = post_json(
            app,
            "/student/curriculum-feedback",
            serde_json::json!({
                "answers": {"Q1": 4, "Q2": 5, "Q3": 4, "Q4": 3}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entries_recorded"], 4);
    }

    #[tokio::test]
    async fn test_curriculum_feedback_is_once_only() {
        let state = create_test_state().await;
        let (user, _) = create_test_student(&state, "AIML", 3).await;
        create_campaign_with_questions(&state, CampaignKind::Curriculum).await;

        let request = serde_json::json!({
            "answers": {"Q1": 4, "Q2": 5, "Q3": 4, "Q4": 3}
        });

        let app = student_router(state.clone(), user.clone());
        let (status, _) = post_json(app, "/student/curriculum-feedback", request.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let app = student_router(state, user);
        let (status, body) = post_json(app, "/student/curriculum-feedback", request).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }
}
