//! API routes.

pub mod admin;
pub mod auth;
pub mod campaigns;
pub mod coordinator;
pub mod faculty;
pub mod guest;
pub mod health;
pub mod metrics;
pub mod student;

use crate::state::AppState;
use axum::Router;

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Versioned API endpoint
        .nest("/api/v1", api_routes())
        // Legacy unversioned endpoint (deprecated, will be removed in future versions)
        .nest("/api", api_routes())
        .merge(health::routes())
        .merge(metrics::routes())
        .merge(auth::routes())
        .with_state(state)
}

/// API routes under /api prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::api_routes())
        .nest("/campaigns", campaigns::routes())
        .nest("/student", student::routes())
        .nest("/guest", guest::routes())
        .nest("/faculty", faculty::routes())
        .nest("/coordinator", coordinator::routes())
        .nest("/admin", admin::routes())
}
