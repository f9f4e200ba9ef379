//! Common test utilities for integration tests.

use axum::{
    body::Body,
    http::{Method, StatusCode},
    Router,
};
use cp_api::{state::AppState, ApiServer};
use cp_core::db::DbPool;
use cp_core::visibility::DEFAULT_FLAG_NAMES;
use cp_core::{InMemoryVisibilityStore, VisibilityFlag, VisibilityFlags};
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Creates an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    let unique_id = Uuid::new_v4();
    let db_url = format!(
        "sqlite:file:integration_test_{}?mode=memory&cache=shared",
        unique_id
    );

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .expect("Failed to create SQLite pool");

    run_migrations(&pool).await;
    pool
}

/// Runs all database migrations.
async fn run_migrations(pool: &SqlitePool) {
    sqlx::query(include_str!(
        "../../../../cp-core/src/db/migrations/sqlite/0001_initial_schema.sql"
    ))
    .execute(pool)
    .await
    .expect("Failed to run initial schema");
}

/// Creates an AppState with a test database and every flag enabled.
pub async fn create_test_state() -> AppState {
    let pool = setup_test_db().await;
    let db = DbPool::Sqlite(pool);

    let flags: Vec<VisibilityFlag> = DEFAULT_FLAG_NAMES
        .iter()
        .map(|name| VisibilityFlag::new(name, true))
        .collect();
    let store = Arc::new(InMemoryVisibilityStore::with_flags(flags.clone()));
    let visibility = VisibilityFlags::with_flags(store, flags);

    AppState::new(db, visibility)
}

/// Creates the full application router, session layer included.
pub async fn create_test_app() -> (Router, AppState) {
    let state = create_test_state().await;
    let router = ApiServer::with_state(state.clone()).router();
    (router, state)
}

/// Helper to make GET requests.
pub fn get_request(uri: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests with JSON body.
pub fn post_json_request(uri: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make POST requests with form body and a session cookie.
pub fn post_form_request(uri: &str, cookie: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Cookie", cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends request and parses JSON response.
pub async fn send_request<T: DeserializeOwned>(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: T = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Failed to parse response: {} - Body: {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, parsed)
}

/// Sends request and returns raw response body.
pub async fn send_request_raw(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Sends request and returns the full response for header inspection.
pub async fn send_request_full(
    app: Router,
    request: axum::extract::Request<Body>,
) -> axum::response::Response {
    app.oneshot(request).await.unwrap()
}
