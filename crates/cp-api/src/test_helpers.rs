//! Shared test helpers for the cp-api crate.
//!
//! This module provides common test utilities for setting up test databases,
//! creating test state, and generating academic records. It consolidates
//! patterns used across multiple test modules to reduce duplication.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::{create_test_state, create_test_student};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let state = create_test_state().await;
//!     let (user, student) = create_test_student(&state, "CSE", 5).await;
//!     // ... test logic
//! }
//! ```

use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use cp_core::academics::{Faculty, Student, Subject, SubjectKind, TeachingAssignment};
use cp_core::db::{
    create_campaign_repository, create_faculty_repository, create_student_repository,
    create_subject_repository, create_user_repository, DbPool,
};
use cp_core::feedback::{Campaign, CampaignKind, Question};
use cp_core::visibility::DEFAULT_FLAG_NAMES;
use cp_core::{
    hash_password, InMemoryVisibilityStore, Role, User, VisibilityFlag, VisibilityFlags,
};

use crate::state::AppState;

/// Password used for every account created by these helpers.
///
/// Satisfies the strength rules so handlers that re-validate it pass.
pub const TEST_PASSWORD: &str = "Testpass1";

// ============================================================================
// Database Setup
// ============================================================================

/// Creates an in-memory SQLite pool with the full schema for testing.
///
/// Each call creates a completely isolated database with a unique identifier,
/// ensuring tests don't interfere with each other when run in parallel.
///
/// # Panics
///
/// Panics if the database connection or schema creation fails.
pub async fn setup_test_db() -> SqlitePool {
    // Use a unique UUID for complete database isolation
    let unique_id = Uuid::new_v4();
    let db_url = format!("sqlite:file:test_db_{}?mode=memory&cache=shared", unique_id);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .expect("Failed to create SQLite pool");

    run_migrations(&pool).await;

    pool
}

/// Runs the schema migration on the provided pool.
async fn run_migrations(pool: &SqlitePool) {
    sqlx::query(include_str!(
        "../../cp-core/src/db/migrations/sqlite/0001_initial_schema.sql"
    ))
    .execute(pool)
    .await
    .expect("Failed to run initial schema migration");
}

// ============================================================================
// State Creation
// ============================================================================

/// Creates visibility flags for testing with every default flag enabled.
fn create_test_visibility() -> VisibilityFlags {
    let flags: Vec<VisibilityFlag> = DEFAULT_FLAG_NAMES
        .iter()
        .map(|name| VisibilityFlag::new(name, true))
        .collect();
    VisibilityFlags::with_flags(Arc::new(InMemoryVisibilityStore::new()), flags)
}

/// Creates an `AppState` with an isolated test database.
///
/// This is the primary entry point for most tests. All visibility flags
/// start enabled; use [`create_test_state_with_flags`] to start with some
/// disabled.
pub async fn create_test_state() -> AppState {
    let pool = setup_test_db().await;
    let db = DbPool::Sqlite(pool);
    AppState::new(db, create_test_visibility())
}

/// Creates an `AppState` whose visibility cache starts with the given flags.
///
/// Flags not listed fall back to the unknown-flag default (enabled).
pub async fn create_test_state_with_flags(flags: Vec<VisibilityFlag>) -> AppState {
    let pool = setup_test_db().await;
    let db = DbPool::Sqlite(pool);
    let visibility = VisibilityFlags::with_flags(Arc::new(InMemoryVisibilityStore::new()), flags);
    AppState::new(db, visibility)
}

/// Creates an `AppState` and returns both the state and the underlying pool.
///
/// Useful when tests need both the state for API operations and direct pool
/// access for database assertions.
pub async fn create_test_state_with_pool() -> (AppState, SqlitePool) {
    let pool = setup_test_db().await;
    let db = DbPool::Sqlite(pool.clone());
    let state = AppState::new(db, create_test_visibility());
    (state, pool)
}

// ============================================================================
// Account and Record Creation
// ============================================================================

/// Short unique suffix for emails and PRNs so parallel tests never collide.
pub fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Creates a user account and saves it to the database.
///
/// The account uses [`TEST_PASSWORD`] and is enabled.
pub async fn create_test_user(state: &AppState, email: &str, name: &str, role: Role) -> User {
    let password_hash = hash_password(TEST_PASSWORD).expect("Failed to hash test password");
    let user = User::new(email, name, &password_hash, role);
    let repo = create_user_repository(&state.db);
    repo.create(&user).await.expect("Failed to create test user")
}

/// Creates a student account together with its student record.
///
/// Returns the user row and the student row. The generated PRN and email
/// are unique per call.
pub async fn create_test_student(
    state: &AppState,
    branch: &str,
    semester: i32,
) -> (User, Student) {
    let suffix = unique_suffix();
    let email = format!("student{}.btech23@sitpune.edu.in", suffix);
    let name = format!("Student {}", suffix);
    let user = create_test_user(state, &email, &name, Role::Student).await;
    let user = {
        let repo = create_user_repository(&state.db);
        repo.update(
            user.id,
            &cp_core::UserUpdate {
                branch: Some(Some(branch.to_string())),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to set student branch")
    };

    let prn = format!("PRN{}", suffix.to_uppercase());
    let student = Student::new(&prn, &name, &email, branch, semester, user.id);
    let repo = create_student_repository(&state.db);
    let student = repo
        .create(&student)
        .await
        .expect("Failed to create test student");
    (user, student)
}

/// Creates a faculty account together with its faculty record.
pub async fn create_test_faculty(state: &AppState, department: &str) -> (User, Faculty) {
    let suffix = unique_suffix();
    let email = format!("faculty{}@sitpune.edu.in", suffix);
    let name = format!("Prof. {}", suffix);
    let user = create_test_user(state, &email, &name, Role::Faculty).await;

    let faculty = Faculty::new(&name, &email, department, user.id);
    let repo = create_faculty_repository(&state.db);
    let faculty = repo
        .create(&faculty)
        .await
        .expect("Failed to create test faculty");
    (user, faculty)
}

/// Creates a theory subject.
pub async fn create_test_subject(state: &AppState, name: &str) -> Subject {
    let subject = Subject::new(name, SubjectKind::Theory);
    let repo = create_subject_repository(&state.db);
    repo.create(&subject)
        .await
        .expect("Failed to create test subject")
}

/// Assigns a subject to a faculty member for a batch.
pub async fn assign_subject(
    state: &AppState,
    faculty_id: Uuid,
    subject_id: Uuid,
    batch: &str,
) -> TeachingAssignment {
    let assignment = TeachingAssignment::new(faculty_id, subject_id, batch);
    let repo = create_subject_repository(&state.db);
    repo.create_assignment(&assignment)
        .await
        .expect("Failed to create test assignment")
}

/// Creates a campaign of the given kind with its default question set stored.
///
/// Returns the campaign and its questions in position order.
pub async fn create_campaign_with_questions(
    state: &AppState,
    kind: CampaignKind,
) -> (Campaign, Vec<Question>) {
    let repo = create_campaign_repository(&state.db);
    let campaign = repo
        .create(&Campaign::new(kind.title()))
        .await
        .expect("Failed to create test campaign");

    let mut questions = Vec::new();
    for (position, (text, question_kind)) in kind.default_questions().into_iter().enumerate() {
        let question = Question::new(campaign.id, (position + 1) as i32, &text, question_kind);
        let question = repo
            .add_question(&question)
            .await
            .expect("Failed to add test question");
        questions.push(question);
    }

    (campaign, questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_core::db::create_feedback_repository;
    use cp_core::feedback::QuestionKind;

    #[tokio::test]
    async fn test_setup_test_db_creates_tables() {
        let pool = setup_test_db().await;

        for table in [
            "users",
            "students",
            "faculty",
            "subjects",
            "teaching_assignments",
            "campaigns",
            "questions",
            "feedback_entries",
            "remarks",
            "visibility_flags",
        ] {
            let result =
                sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
                    .bind(table)
                    .fetch_optional(&pool)
                    .await
                    .expect("Query failed");
            assert!(result.is_some(), "{} table should exist", table);
        }
    }

    #[tokio::test]
    async fn test_database_isolation() {
        let state1 = create_test_state().await;
        let state2 = create_test_state().await;

        let _ = create_test_student(&state1, "CSE", 5).await;

        let repo = create_student_repository(&state2.db);
        let students = repo
            .list_by_branch("CSE")
            .await
            .expect("Failed to list students");
        assert!(
            students.is_empty(),
            "State2 should not see students from state1"
        );
    }

    #[tokio::test]
    async fn test_create_test_student_links_user() {
        let state = create_test_state().await;
        let (user, student) = create_test_student(&state, "AIML", 3).await;

        assert_eq!(student.user_id, user.id);
        assert_eq!(student.branch, "AIML");
        assert_eq!(user.branch.as_deref(), Some("AIML"));

        let repo = create_student_repository(&state.db);
        let by_user = repo
            .get_by_user(user.id)
            .await
            .expect("Query failed")
            .expect("Student record should exist");
        assert_eq!(by_user.id, student.id);
    }

    #[tokio::test]
    async fn test_create_campaign_with_questions_orders_by_position() {
        let state = create_test_state().await;
        let (campaign, questions) =
            create_campaign_with_questions(&state, CampaignKind::Curriculum).await;

        assert_eq!(questions.len(), 5);
        assert_eq!(questions[0].position, 1);
        assert_eq!(questions[4].kind, QuestionKind::Text);

        let repo = create_campaign_repository(&state.db);
        let stored = repo
            .list_questions(campaign.id)
            .await
            .expect("Failed to list questions");
        assert_eq!(stored.len(), 5);
        assert!(stored.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[tokio::test]
    async fn test_feedback_entries_roundtrip() {
        let state = create_test_state().await;
        let (_, student) = create_test_student(&state, "CSE", 5).await;
        let (_, faculty) = create_test_faculty(&state, "CSE").await;
        let subject = create_test_subject(&state, "Operating Systems").await;
        let (campaign, questions) =
            create_campaign_with_questions(&state, CampaignKind::Faculty).await;

        let entry = cp_core::FeedbackEntry::faculty_response(
            campaign.id,
            student.id,
            faculty.id,
            subject.id,
            questions[0].id,
            "5",
        );
        let repo = create_feedback_repository(&state.db);
        let inserted = repo
            .insert_entries(&[entry])
            .await
            .expect("Failed to insert feedback");
        assert_eq!(inserted, 1);

        let count = repo
            .count_valid_for_student(campaign.id, student.id)
            .await
            .expect("Failed to count feedback");
        assert_eq!(count, 1);
    }
}
