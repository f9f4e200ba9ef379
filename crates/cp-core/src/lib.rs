//! # cp-core
//!
//! Core domain models and persistence for Campus Pulse.
//!
//! This crate provides the role and account model, academic records, feedback
//! campaigns and their entries, rating aggregation, CSV report builders, and
//! the visibility flag service for the Campus Pulse system.

pub mod academics;
pub mod analytics;
pub mod auth;
pub mod feedback;
pub mod reports;
pub mod roster;
pub mod visibility;

#[cfg(feature = "database")]
pub mod db;

pub use academics::{
    Elective, Faculty, Student, Subject, SubjectKind, TeachingAssignment, TeachingRoster,
    UNKNOWN_BATCH,
};
pub use analytics::{
    aggregate_faculty_ratings, collect_text_remarks, participation, BranchOverview,
    ParticipationStats, RatingBreakdownRow, SubjectRemarkRow,
};
pub use feedback::{
    is_textual_answer, parse_question_key, Campaign, CampaignKind, FeedbackEntry, Question,
    QuestionForm, QuestionKind, Remark, MAX_FEEDBACK_TARGETS, RATING_MAX, RATING_MIN,
};
pub use reports::ReportLookups;
pub use roster::{parse_roster_csv, RosterImportReport, RosterRow, RosterRowError};
pub use visibility::{
    InMemoryVisibilityStore, VisibilityError, VisibilityFlag, VisibilityFlags, VisibilityStore,
};

// Auth exports
pub use auth::password::{
    hash_password, validate_password_strength, verify_password, PasswordError,
};
pub use auth::{Role, SessionData, User, UserFilter, UserUpdate};
