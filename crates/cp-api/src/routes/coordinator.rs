//! Branch coordinator routes: participation overview, CSV reports, roster
//! management, and the student sign-in toggle.
//!
//! Every handler resolves the coordinator's branch from their user row and
//! scopes all data to it. Accounts without a branch get a clear 400 rather
//! than an empty dashboard.

use std::collections::{HashMap, HashSet};

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use cp_core::academics::{Student, TeachingRoster};
use cp_core::auth::password::hash_password;
use cp_core::db::{
    create_campaign_repository, create_faculty_repository, create_feedback_repository,
    create_remark_repository, create_student_repository, create_subject_repository,
    create_user_repository,
};
use cp_core::reports::{
    branch_feedback_csv, complete_feedback_csv, consolidated_feedback_csv,
    outstanding_students_csv, remarks_csv, roster_export_csv, roster_template_csv,
};
use cp_core::visibility::STUDENT_LOGIN;
use cp_core::{
    parse_roster_csv, BranchOverview, Campaign, CampaignKind, ReportLookups, Role,
    RosterImportReport, User, VisibilityFlag,
};
use cp_observability::{REPORTS_GENERATED_TOTAL, ROSTER_IMPORTS_TOTAL};

use crate::auth::RequireCoordinator;
use crate::error::ApiError;
use crate::routes::campaigns::campaign_for_kind;
use crate::routes::student::StudentProfileResponse;
use crate::state::AppState;

/// Body for the student sign-in toggle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleRequest {
    pub enabled: bool,
}

/// Import summary echoed back to the coordinator.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RosterImportResponse {
    #[serde(flatten)]
    pub report: RosterImportReport,
    pub message: String,
}

/// Creates the coordinator routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/reports/outstanding", get(outstanding_report))
        .route("/reports/feedback", get(feedback_report))
        .route("/reports/remarks", get(remarks_report))
        .route("/reports/consolidated", get(consolidated_report))
        .route("/reports/complete", get(complete_report))
        .route("/students", get(list_students))
        .route("/students/template", get(roster_template))
        .route("/students/export", get(roster_export))
        .route("/students/import", post(roster_import))
        .route("/toggles/student-login", put(set_student_login))
}

/// Participation overview for the coordinator's branch.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/overview",
    tag = "coordinator",
    responses(
        (status = 200, description = "Branch overview", body = BranchOverview),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn overview(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<Json<BranchOverview>, ApiError> {
    let branch = coordinator_branch(&user)?;

    let student_repo = create_student_repository(&state.db);
    let faculty_repo = create_faculty_repository(&state.db);
    let subject_repo = create_subject_repository(&state.db);

    let total_students = student_repo.count_by_branch(&branch).await?;
    let total_faculty = faculty_repo.count_by_branch(&branch).await?;
    let total_subjects = subject_repo.count_subjects_taught_in_branch(&branch).await?;

    let faculty_submitted = submitter_count(&state, CampaignKind::Faculty, &branch).await?;
    let curriculum_submitted = submitter_count(&state, CampaignKind::Curriculum, &branch).await?;

    Ok(Json(BranchOverview::assemble(
        &branch,
        total_students,
        total_faculty,
        total_subjects,
        faculty_submitted,
        curriculum_submitted,
    )))
}

/// CSV of branch students who have not submitted faculty feedback.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/reports/outstanding",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn outstanding_report(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<impl IntoResponse, ApiError> {
    let branch = coordinator_branch(&user)?;

    let student_repo = create_student_repository(&state.db);
    let students = student_repo.list_by_branch(&branch).await?;

    let campaign_repo = create_campaign_repository(&state.db);
    let submitted: HashSet<Uuid> = match campaign_repo
        .find_by_name_fragment(CampaignKind::Faculty.name_fragment())
        .await?
    {
        Some(campaign) => {
            let feedback_repo = create_feedback_repository(&state.db);
            feedback_repo
                .distinct_submitters(campaign.id, &branch)
                .await?
                .into_iter()
                .collect()
        }
        None => HashSet::new(),
    };

    let csv = outstanding_students_csv(&students, &submitted);
    counter!(REPORTS_GENERATED_TOTAL, "report" => "outstanding").increment(1);
    Ok(csv_response(&branch, "outstanding_students", csv))
}

/// CSV of every valid faculty-campaign answer for the branch, anonymized.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/reports/feedback",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator"),
        (status = 503, description = "Faculty campaign not configured")
    )
)]
async fn feedback_report(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<impl IntoResponse, ApiError> {
    let branch = coordinator_branch(&user)?;
    let campaign = campaign_for_kind(&state, CampaignKind::Faculty).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    let entries = feedback_repo
        .list_valid_for_branch_campaign(campaign.id, &branch)
        .await?;
    let lookups = report_lookups(&state, &campaign, &branch).await?;

    let csv = branch_feedback_csv(&entries, &lookups);
    counter!(REPORTS_GENERATED_TOTAL, "report" => "feedback").increment(1);
    Ok(csv_response(&branch, "feedback", csv))
}

/// CSV of the branch's anonymous remarks.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/reports/remarks",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn remarks_report(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<impl IntoResponse, ApiError> {
    let branch = coordinator_branch(&user)?;

    let remark_repo = create_remark_repository(&state.db);
    let remarks = remark_repo.list_by_branch(&branch).await?;

    let csv = remarks_csv(&remarks);
    counter!(REPORTS_GENERATED_TOTAL, "report" => "remarks").increment(1);
    Ok(csv_response(&branch, "remarks", csv))
}

/// CSV of per (faculty, subject, batch) average ratings.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/reports/consolidated",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator"),
        (status = 503, description = "Faculty campaign not configured")
    )
)]
async fn consolidated_report(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<impl IntoResponse, ApiError> {
    let branch = coordinator_branch(&user)?;
    let campaign = campaign_for_kind(&state, CampaignKind::Faculty).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    let entries = feedback_repo
        .list_valid_for_branch_campaign(campaign.id, &branch)
        .await?;
    let lookups = report_lookups(&state, &campaign, &branch).await?;

    let csv = consolidated_feedback_csv(&entries, &lookups);
    counter!(REPORTS_GENERATED_TOTAL, "report" => "consolidated").increment(1);
    Ok(csv_response(&branch, "consolidated_feedback", csv))
}

/// CSV of every answer with the submitting student's PRN included.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/reports/complete",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator"),
        (status = 503, description = "Faculty campaign not configured")
    )
)]
async fn complete_report(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<impl IntoResponse, ApiError> {
    let branch = coordinator_branch(&user)?;
    let campaign = campaign_for_kind(&state, CampaignKind::Faculty).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    let entries = feedback_repo
        .list_valid_for_branch_campaign(campaign.id, &branch)
        .await?;
    let lookups = report_lookups(&state, &campaign, &branch).await?;

    let csv = complete_feedback_csv(&entries, &lookups);
    counter!(REPORTS_GENERATED_TOTAL, "report" => "complete").increment(1);
    Ok(csv_response(&branch, "complete_feedback", csv))
}

/// Lists the branch roster.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/students",
    tag = "coordinator",
    responses(
        (status = 200, description = "Branch students", body = [StudentProfileResponse]),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn list_students(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<Json<Vec<StudentProfileResponse>>, ApiError> {
    let branch = coordinator_branch(&user)?;

    let student_repo = create_student_repository(&state.db);
    let students = student_repo.list_by_branch(&branch).await?;

    Ok(Json(
        students.into_iter().map(StudentProfileResponse::from).collect(),
    ))
}

/// The roster import template with one sample row.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/students/template",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV template", content_type = "text/csv"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn roster_template(
    State(state): State<AppState>,
    RequireCoordinator(_user): RequireCoordinator,
) -> impl IntoResponse {
    let csv = roster_template_csv(&state.institute_domain);
    csv_response("roster", "template", csv)
}

/// The current branch roster in template columns.
#[utoipa::path(
    get,
    path = "/api/v1/coordinator/students/export",
    tag = "coordinator",
    responses(
        (status = 200, description = "CSV download", content_type = "text/csv"),
        (status = 400, description = "No branch assigned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn roster_export(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
) -> Result<impl IntoResponse, ApiError> {
    let branch = coordinator_branch(&user)?;

    let student_repo = create_student_repository(&state.db);
    let students = student_repo.list_by_branch(&branch).await?;

    Ok(csv_response(&branch, "roster", roster_export_csv(&students)))
}

/// Imports a roster CSV, creating a student account per new row.
///
/// Rows are always placed in the coordinator's own branch, whatever the
/// file's branch column says. Rows whose PRN or email already exist are
/// skipped. New accounts get the configured default password.
#[utoipa::path(
    post,
    path = "/api/v1/coordinator/students/import",
    tag = "coordinator",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import summary", body = RosterImportResponse),
        (status = 400, description = "No branch assigned or empty upload"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn roster_import(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
    body: String,
) -> Result<Json<RosterImportResponse>, ApiError> {
    let branch = coordinator_branch(&user)?;

    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let (rows, errors) = parse_roster_csv(&body);
    let mut report = RosterImportReport {
        failed: errors.len() as u64,
        errors,
        ..Default::default()
    };

    // One hash for the whole batch; every new account starts on the same
    // default password.
    let password_hash = hash_password(&state.default_student_password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash default password: {e}")))?;

    let user_repo = create_user_repository(&state.db);
    let student_repo = create_student_repository(&state.db);

    for row in rows {
        if student_repo.get_by_prn(&row.prn).await?.is_some()
            || user_repo.get_by_email(&row.email).await?.is_some()
        {
            report.skipped += 1;
            continue;
        }

        let mut account = User::new(&row.email, &row.name, &password_hash, Role::Student);
        account.branch = Some(branch.clone());
        let account = user_repo.create(&account).await?;

        student_repo
            .create(&Student::new(
                &row.prn,
                &row.name,
                &row.email,
                &branch,
                row.semester,
                account.id,
            ))
            .await?;
        report.imported += 1;
    }

    counter!(ROSTER_IMPORTS_TOTAL, "branch" => branch.clone()).increment(1);
    info!(
        branch = %branch,
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed,
        "Roster import completed"
    );

    let message = format!(
        "Imported {} students ({} skipped, {} failed)",
        report.imported, report.skipped, report.failed
    );
    Ok(Json(RosterImportResponse { report, message }))
}

/// Turns student sign-in on or off.
///
/// Coordinators control only this one flag; the rest stay with the admin.
#[utoipa::path(
    put,
    path = "/api/v1/coordinator/toggles/student-login",
    tag = "coordinator",
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Updated flag", body = VisibilityFlag),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a coordinator")
    )
)]
async fn set_student_login(
    State(state): State<AppState>,
    RequireCoordinator(user): RequireCoordinator,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<VisibilityFlag>, ApiError> {
    let flag = state.visibility.set_enabled(STUDENT_LOGIN, body.enabled).await?;
    info!(
        enabled = body.enabled,
        coordinator = %user.email,
        "Student login toggled"
    );
    Ok(Json(flag))
}

/// The branch on the coordinator's user row.
fn coordinator_branch(user: &User) -> Result<String, ApiError> {
    user.branch.clone().ok_or_else(|| {
        ApiError::BadRequest(
            "No branch is assigned to this coordinator account".to_string(),
        )
    })
}

/// Distinct submitters for a campaign kind, 0 when the campaign is missing.
async fn submitter_count(
    state: &AppState,
    kind: CampaignKind,
    branch: &str,
) -> Result<u64, ApiError> {
    let campaign_repo = create_campaign_repository(&state.db);
    let Some(campaign) = campaign_repo
        .find_by_name_fragment(kind.name_fragment())
        .await?
    else {
        return Ok(0);
    };

    let feedback_repo = create_feedback_repository(&state.db);
    let submitters = feedback_repo
        .distinct_submitters(campaign.id, branch)
        .await?;
    Ok(submitters.len() as u64)
}

/// Name and key lookups the CSV builders need.
async fn report_lookups(
    state: &AppState,
    campaign: &Campaign,
    branch: &str,
) -> Result<ReportLookups, ApiError> {
    let subject_repo = create_subject_repository(&state.db);
    let subjects = subject_repo.list().await?;
    let subject_ids: Vec<Uuid> = subjects.iter().map(|s| s.id).collect();
    let assignments = subject_repo
        .list_assignments_for_subjects(&subject_ids)
        .await?;

    let faculty_repo = create_faculty_repository(&state.db);
    let faculty_names: HashMap<Uuid, String> = faculty_repo
        .list()
        .await?
        .into_iter()
        .map(|f| (f.id, f.name))
        .collect();

    let campaign_repo = create_campaign_repository(&state.db);
    let question_keys: HashMap<Uuid, String> = campaign_repo
        .list_questions(campaign.id)
        .await?
        .iter()
        .map(|q| (q.id, q.key()))
        .collect();

    let student_repo = create_student_repository(&state.db);
    let student_prns: HashMap<Uuid, String> = student_repo
        .list_by_branch(branch)
        .await?
        .into_iter()
        .map(|s| (s.id, s.prn))
        .collect();

    Ok(ReportLookups {
        roster: TeachingRoster::from_assignments(&assignments),
        subject_names: subjects.into_iter().map(|s| (s.id, s.name)).collect(),
        faculty_names,
        question_keys,
        student_prns,
    })
}

/// CSV body with a download disposition.
fn csv_response(prefix: &str, report: &str, csv: String) -> impl IntoResponse {
    let filename = format!("{}_{}.csv", prefix.to_lowercase(), report);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::{inject_test_user, TestUser};
    use crate::test_helpers::{
        assign_subject, create_campaign_with_questions, create_test_faculty, create_test_state,
        create_test_student, create_test_subject, create_test_user,
    };
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware;
    use cp_core::auth::password::verify_password;
    use cp_core::db::create_feedback_repository;
    use cp_core::{FeedbackEntry, Remark};
    use tower::ServiceExt;

    fn coordinator_router(state: AppState, user: User) -> Router {
        Router::new()
            .nest("/coordinator", routes())
            .layer(middleware::from_fn(move |req, next| {
                inject_test_user(TestUser(user.clone()), req, next)
            }))
            .with_state(state)
    }

    async fn coordinator_for(state: &AppState, branch: &str) -> User {
        let user = create_test_user(
            state,
            &format!("coord.{}@sitpune.edu.in", crate::test_helpers::unique_suffix()),
            "Branch Coordinator",
            Role::Coordinator,
        )
        .await;
        let repo = create_user_repository(&state.db);
        repo.update(
            user.id,
            &cp_core::UserUpdate {
                branch: Some(Some(branch.to_string())),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to set coordinator branch")
    }

    async fn get_response(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed")
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = get_response(app, uri).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn get_csv(app: Router, uri: &str) -> (StatusCode, String, String) {
        let response = get_response(app, uri).await;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, content_type, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn send_body(
        app: Router,
        method: &str,
        uri: &str,
        content_type: &str,
        body: String,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
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

    /// One branch with two students, one rated subject, and one submission
    /// from the first student.
    async fn seed_branch(state: &AppState) -> (Student, Student) {
        let (_, first) = create_test_student(state, "CSE", 5).await;
        let (_, second) = create_test_student(state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(state, "CSE").await;
        let subject = create_test_subject(state, "Compilers").await;
        assign_subject(state, faculty.id, subject.id, "A1").await;

        let (campaign, questions) =
            create_campaign_with_questions(state, CampaignKind::Faculty).await;
        let entries = vec![
            FeedbackEntry::faculty_response(
                campaign.id,
                first.id,
                faculty.id,
                subject.id,
                questions[0].id,
                "4",
            ),
            FeedbackEntry::faculty_response(
                campaign.id,
                first.id,
                faculty.id,
                subject.id,
                questions[1].id,
                "5",
            ),
        ];
        let repo = create_feedback_repository(&state.db);
        repo.insert_entries(&entries)
            .await
            .expect("Failed to insert entries");

        (first, second)
    }

    #[tokio::test]
    async fn test_overview_counts_branch_participation() {
        let state = create_test_state().await;
        seed_branch(&state).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, body) = get_json(app, "/coordinator/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["branch"], "CSE");
        assert_eq!(body["total_students"], 2);
        assert_eq!(body["faculty_feedback"]["submitted"], 1);
        assert_eq!(body["faculty_feedback"]["total"], 2);
        assert_eq!(body["faculty_feedback"]["percentage"], 50);
        assert_eq!(body["curriculum_feedback"]["submitted"], 0);
        assert_eq!(body["pending_submissions"], 1);
    }

    #[tokio::test]
    async fn test_overview_requires_branch() {
        let state = create_test_state().await;
        let coordinator = create_test_user(
            &state,
            "branchless@sitpune.edu.in",
            "No Branch",
            Role::Coordinator,
        )
        .await;
        let app = coordinator_router(state, coordinator);

        let (status, body) = get_json(app, "/coordinator/overview").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_outstanding_report_lists_non_submitters_only() {
        let state = create_test_state().await;
        let (first, second) = seed_branch(&state).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, content_type, csv) =
            get_csv(app, "/coordinator/reports/outstanding").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/csv"));
        assert!(!csv.contains(&first.prn));
        assert!(csv.contains(&second.prn));
    }

    #[tokio::test]
    async fn test_feedback_report_contains_answers() {
        let state = create_test_state().await;
        seed_branch(&state).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, _, csv) = get_csv(app, "/coordinator/reports/feedback").await;
        assert_eq!(status, StatusCode::OK);
        assert!(csv.starts_with("Faculty,Subject,Batch,Question,Answer,Submitted At"));
        assert!(csv.contains("Compilers"));
        assert!(csv.contains(",Q1,4,"));
        // The anonymized report never carries a PRN column.
        assert!(!csv.contains("PRN"));
    }

    #[tokio::test]
    async fn test_consolidated_report_averages_ratings() {
        let state = create_test_state().await;
        seed_branch(&state).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, _, csv) = get_csv(app, "/coordinator/reports/consolidated").await;
        assert_eq!(status, StatusCode::OK);
        assert!(csv.contains("4.50"));
    }

    #[tokio::test]
    async fn test_complete_report_includes_prn() {
        let state = create_test_state().await;
        let (first, _) = seed_branch(&state).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, _, csv) = get_csv(app, "/coordinator/reports/complete").await;
        assert_eq!(status, StatusCode::OK);
        assert!(csv.contains(&first.prn));
    }

    #[tokio::test]
    async fn test_feedback_report_without_campaign_is_unavailable() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, body) = get_json(app, "/coordinator/reports/feedback").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_remarks_report_contains_branch_remarks() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let remark_repo = create_remark_repository(&state.db);
        remark_repo
            .create(&Remark::new("Labs need more sessions", "CSE"))
            .await
            .expect("Failed to create remark");
        remark_repo
            .create(&Remark::new("Other branch remark", "MECH"))
            .await
            .expect("Failed to create remark");
        let app = coordinator_router(state, coordinator);

        let (status, _, csv) = get_csv(app, "/coordinator/reports/remarks").await;
        assert_eq!(status, StatusCode::OK);
        assert!(csv.contains("Labs need more sessions"));
        assert!(!csv.contains("Other branch remark"));
    }

    #[tokio::test]
    async fn test_students_lists_own_branch_only() {
        let state = create_test_state().await;
        let (_, cse_student) = create_test_student(&state, "CSE", 3).await;
        create_test_student(&state, "MECH", 3).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, body) = get_json(app, "/coordinator/students").await;
        assert_eq!(status, StatusCode::OK);
        let students = body.as_array().expect("Expected array");
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["prn"], cse_student.prn);
    }

    #[tokio::test]
    async fn test_template_uses_institute_domain() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, content_type, csv) =
            get_csv(app, "/coordinator/students/template").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/csv"));
        assert!(csv.starts_with("PRN,Name,Email,Branch,Semester"));
        assert!(csv.contains("@sitpune.edu.in"));
    }

    #[tokio::test]
    async fn test_export_round_trips_roster() {
        let state = create_test_state().await;
        let (_, student) = create_test_student(&state, "CSE", 6).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, _, csv) = get_csv(app, "/coordinator/students/export").await;
        assert_eq!(status, StatusCode::OK);
        assert!(csv.contains(&student.prn));
        assert!(csv.contains(&student.email));
    }

    #[tokio::test]
    async fn test_import_creates_student_accounts() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state.clone(), coordinator);

        let csv = "PRN,Name,Email,Branch,Semester\n\
                   PRNCSE901,Asha Rao,asha.rao.btech23@sitpune.edu.in,CSE,4\n\
                   PRNCSE902,Vikram Iyer,vikram.iyer.btech23@sitpune.edu.in,CSE,4\n";
        let (status, body) = send_body(
            app,
            "POST",
            "/coordinator/students/import",
            "text/csv",
            csv.to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);
        assert_eq!(body["skipped"], 0);
        assert_eq!(body["failed"], 0);

        let student_repo = create_student_repository(&state.db);
        let student = student_repo
            .get_by_prn("PRNCSE901")
            .await
            .expect("Query failed")
            .expect("Student should exist");
        assert_eq!(student.branch, "CSE");

        let user_repo = create_user_repository(&state.db);
        let account = user_repo
            .get_by_email("asha.rao.btech23@sitpune.edu.in")
            .await
            .expect("Query failed")
            .expect("Account should exist");
        assert_eq!(account.role, Role::Student);
        assert_eq!(account.branch.as_deref(), Some("CSE"));
        assert!(
            verify_password(&state.default_student_password, &account.password_hash)
                .expect("Verification failed")
        );
    }

    #[tokio::test]
    async fn test_import_forces_coordinator_branch() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state.clone(), coordinator);

        let csv = "PRN,Name,Email,Branch,Semester\n\
                   PRNMECH55,Rohan Patil,rohan.patil.btech23@sitpune.edu.in,MECH,4\n";
        let (status, body) = send_body(
            app,
            "POST",
            "/coordinator/students/import",
            "text/csv",
            csv.to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 1);

        let student_repo = create_student_repository(&state.db);
        let student = student_repo
            .get_by_prn("PRNMECH55")
            .await
            .expect("Query failed")
            .expect("Student should exist");
        assert_eq!(student.branch, "CSE");
    }

    #[tokio::test]
    async fn test_import_skips_existing_prn() {
        let state = create_test_state().await;
        let (_, existing) = create_test_student(&state, "CSE", 4).await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let csv = format!(
            "PRN,Name,Email,Branch,Semester\n{},Someone Else,someone.else.btech23@sitpune.edu.in,CSE,4\n",
            existing.prn
        );
        let (status, body) =
            send_body(app, "POST", "/coordinator/students/import", "text/csv", csv).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 0);
        assert_eq!(body["skipped"], 1);
    }

    #[tokio::test]
    async fn test_import_reports_bad_rows() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let csv = "PRN,Name,Email,Branch,Semester\n\
                   PRNCSE903,Mira Shah,mira.shah.btech23@sitpune.edu.in,CSE,nine\n";
        let (status, body) =
            send_body(app, "POST", "/coordinator/students/import", "text/csv", csv.to_string())
                .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 0);
        assert_eq!(body["failed"], 1);
        assert!(!body["errors"].as_array().expect("Expected errors").is_empty());
    }

    #[tokio::test]
    async fn test_import_rejects_empty_body() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state, coordinator);

        let (status, body) = send_body(
            app,
            "POST",
            "/coordinator/students/import",
            "text/csv",
            "   \n".to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_student_login_toggle_updates_flag() {
        let state = create_test_state().await;
        let coordinator = coordinator_for(&state, "CSE").await;
        let app = coordinator_router(state.clone(), coordinator);

        let (status, body) = send_body(
            app,
            "PUT",
            "/coordinator/toggles/student-login",
            "application/json",
            serde_json::json!({ "enabled": false }).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], STUDENT_LOGIN);
        assert_eq!(body["enabled"], false);
        assert!(!state.visibility.is_enabled(STUDENT_LOGIN));
    }

    #[tokio::test]
    async fn test_coordinator_routes_reject_students() {
        let state = create_test_state().await;
        let app = coordinator_router(state, TestUser::student().0);

        let (status, _) = get_json(app, "/coordinator/overview").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_csv_filename_is_lowercased() {
        let response = csv_response("CSE", "remarks", "a,b\n".to_string());
        let response = response.into_response();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("Expected disposition header");
        assert_eq!(disposition, "attachment; filename=\"cse_remarks.csv\"");
    }
}
