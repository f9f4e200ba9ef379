//! # cp-api
//!
//! REST API server for Campus Pulse.
//!
//! This crate provides the HTTP API for feedback submission, role-gated
//! analytics, CSV reporting, and the session-backed login flow.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;
pub mod web;

#[cfg(test)]
pub mod test_helpers;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
