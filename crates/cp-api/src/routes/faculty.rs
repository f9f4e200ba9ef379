//! Faculty routes: profile, rating breakdown, and free-text remarks.

use std::collections::{HashMap, HashSet};

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use cp_core::academics::{Faculty, TeachingRoster};
use cp_core::db::{
    create_faculty_repository, create_feedback_repository, create_student_repository,
    create_subject_repository,
};
use cp_core::visibility::FACULTY_DASHBOARD;
use cp_core::{aggregate_faculty_ratings, collect_text_remarks, RatingBreakdownRow, SubjectRemarkRow};

use crate::auth::RequireFaculty;
use crate::error::ApiError;
use crate::state::AppState;

/// One subject the faculty member teaches.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaughtSubjectResponse {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub batch: String,
}

/// The faculty member's own record and teaching load.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FacultyProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department: String,
    pub subjects: Vec<TaughtSubjectResponse>,
}

/// Rating breakdown plus the filter facets the dashboard offers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FacultyRatingsResponse {
    pub ratings: Vec<RatingBreakdownRow>,
    /// Distinct batches from the member's teaching assignments.
    pub batches: Vec<String>,
    /// Distinct branches of the students who submitted.
    pub branches: Vec<String>,
}

/// Free-text remarks plus the subject facet.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FacultyRemarksResponse {
    pub remarks: Vec<SubjectRemarkRow>,
    /// Distinct subject names from the member's teaching assignments.
    pub subjects: Vec<String>,
}

/// Creates the faculty routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(faculty_profile))
        .route("/ratings", get(faculty_ratings))
        .route("/remarks", get(faculty_remarks))
}

/// Returns the signed-in faculty member's record and teaching load.
#[utoipa::path(
    get,
    path = "/api/v1/faculty/profile",
    tag = "faculty",
    responses(
        (status = 200, description = "Faculty profile", body = FacultyProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Dashboard disabled or not faculty"),
        (status = 404, description = "No faculty record for this account")
    )
)]
async fn faculty_profile(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
) -> Result<Json<FacultyProfileResponse>, ApiError> {
    check_dashboard_enabled(&state)?;
    let faculty = faculty_record(&state, user.id).await?;

    let subject_repo = create_subject_repository(&state.db);
    let assignments = subject_repo.list_assignments_by_faculty(faculty.id).await?;
    let subject_names = subject_name_map(&state).await?;

    let subjects = assignments
        .iter()
        .filter_map(|assignment| {
            subject_names
                .get(&assignment.subject_id)
                .map(|name| TaughtSubjectResponse {
                    subject_id: assignment.subject_id,
                    subject_name: name.clone(),
                    batch: assignment.batch.clone(),
                })
        })
        .collect();

    Ok(Json(FacultyProfileResponse {
        id: faculty.id,
        name: faculty.name,
        email: faculty.email,
        department: faculty.department,
        subjects,
    }))
}

/// Returns the member's rating averages grouped by subject, batch and branch.
#[utoipa::path(
    get,
    path = "/api/v1/faculty/ratings",
    tag = "faculty",
    responses(
        (status = 200, description = "Rating breakdown with facets", body = FacultyRatingsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Dashboard disabled or not faculty"),
        (status = 404, description = "No faculty record for this account")
    )
)]
async fn faculty_ratings(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
) -> Result<Json<FacultyRatingsResponse>, ApiError> {
    check_dashboard_enabled(&state)?;
    let faculty = faculty_record(&state, user.id).await?;

    let subject_repo = create_subject_repository(&state.db);
    let assignments = subject_repo.list_assignments_by_faculty(faculty.id).await?;
    let roster = TeachingRoster::from_assignments(&assignments);
    let subject_names = subject_name_map(&state).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    let entries = feedback_repo.list_valid_by_faculty(faculty.id).await?;
    let student_branches = branch_map_for_entries(&state, &entries).await?;

    let rows = aggregate_faculty_ratings(&entries, &roster, &subject_names, &student_branches);

    let mut batches: Vec<String> = assignments
        .iter()
        .map(|a| a.batch.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    batches.sort();

    let mut branches: Vec<String> = student_branches
        .values()
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    branches.sort();

    Ok(Json(FacultyRatingsResponse {
        ratings: rows,
        batches,
        branches,
    }))
}

/// Returns the free-text answers left about the member, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/faculty/remarks",
    tag = "faculty",
    responses(
        (status = 200, description = "Remarks with subject facet", body = FacultyRemarksResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Dashboard disabled or not faculty"),
        (status = 404, description = "No faculty record for this account")
    )
)]
async fn faculty_remarks(
    State(state): State<AppState>,
    RequireFaculty(user): RequireFaculty,
) -> Result<Json<FacultyRemarksResponse>, ApiError> {
    check_dashboard_enabled(&state)?;
    let faculty = faculty_record(&state, user.id).await?;

    let subject_repo = create_subject_repository(&state.db);
    let assignments = subject_repo.list_assignments_by_faculty(faculty.id).await?;
    let roster = TeachingRoster::from_assignments(&assignments);
    let subject_names = subject_name_map(&state).await?;

    let feedback_repo = create_feedback_repository(&state.db);
    let entries = feedback_repo.list_valid_by_faculty(faculty.id).await?;
    let student_branches = branch_map_for_entries(&state, &entries).await?;

    let rows = collect_text_remarks(&entries, &roster, &subject_names, &student_branches);

    let mut subjects: Vec<String> = assignments
        .iter()
        .filter_map(|a| subject_names.get(&a.subject_id).cloned())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    subjects.sort();

    Ok(Json(FacultyRemarksResponse {
        remarks: rows,
        subjects,
    }))
}

/// The dashboard can be switched off without touching sign-in.
fn check_dashboard_enabled(state: &AppState) -> Result<(), ApiError> {
    if !state.visibility.is_enabled(FACULTY_DASHBOARD) {
        return Err(ApiError::Forbidden(
            "Faculty dashboard is currently disabled.".to_string(),
        ));
    }
    Ok(())
}

/// Looks up the faculty record behind an account.
async fn faculty_record(state: &AppState, user_id: Uuid) -> Result<Faculty, ApiError> {
    let repo = create_faculty_repository(&state.db);
    repo.get_by_user(user_id).await?.ok_or_else(|| {
        ApiError::NotFound("Faculty record not found for this account".to_string())
    })
}

/// Subject id to name lookup.
async fn subject_name_map(state: &AppState) -> Result<HashMap<Uuid, String>, ApiError> {
    let repo = create_subject_repository(&state.db);
    Ok(repo
        .list()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect())
}

/// Branch lookup for the distinct students behind a set of entries.
async fn branch_map_for_entries(
    state: &AppState,
    entries: &[cp_core::FeedbackEntry],
) -> Result<HashMap<Uuid, String>, ApiError> {
    let student_ids: HashSet<Uuid> = entries.iter().filter_map(|e| e.student_id).collect();

    let student_repo = create_student_repository(&state.db);
    let mut branches = HashMap::new();
    for student_id in student_ids {
        if let Some(student) = student_repo.get(student_id).await? {
            branches.insert(student_id, student.branch);
        }
    }
    Ok(branches)
}
