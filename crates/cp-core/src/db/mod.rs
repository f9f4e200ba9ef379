//! Database layer for Campus Pulse.
//!
//! This module provides persistence for users, academic records, feedback
//! campaigns, and visibility flags using SQLx with support for both SQLite
//! (development) and PostgreSQL (production).

mod error;
mod pool;
mod schema;

pub mod campaign_repo;
pub mod faculty_repo;
pub mod feedback_repo;
pub mod remark_repo;
pub mod seed;
pub mod student_repo;
pub mod subject_repo;
pub mod user_repo;
pub mod visibility_repo;

pub use error::DbError;
pub use pool::{
    create_pool, create_pool_with_options, escape_like_pattern, make_like_pattern, DbPool,
    PoolOptions,
};
pub use schema::run_migrations;

// Re-export repository traits and types
pub use campaign_repo::CampaignRepository;
pub use faculty_repo::FacultyRepository;
pub use feedback_repo::FeedbackRepository;
pub use remark_repo::RemarkRepository;
pub use student_repo::StudentRepository;
pub use subject_repo::SubjectRepository;
pub use user_repo::UserRepository;

// Re-export factory functions
pub use campaign_repo::create_campaign_repository;
pub use faculty_repo::create_faculty_repository;
pub use feedback_repo::create_feedback_repository;
pub use remark_repo::create_remark_repository;
pub use student_repo::create_student_repository;
pub use subject_repo::create_subject_repository;
pub use user_repo::create_user_repository;
pub use visibility_repo::create_visibility_store;

pub use seed::{ensure_admin_user, seed_demo_data, SeedSummary};
