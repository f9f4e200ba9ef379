//! Health check endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use utoipa::ToSchema;

use crate::state::AppState;

/// Start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(health_check_detailed))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Overall health response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// "healthy", "restricted", or "unhealthy".
    pub status: String,
    /// Server version.
    pub version: String,
    /// Database connectivity.
    pub database: DatabaseHealth,
    /// Seconds since server start.
    pub uptime_seconds: u64,
    /// Component details, present on `/health/detailed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentsHealth>,
}

/// Database pool health.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: usize,
}

/// Component-level health details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentsHealth {
    pub visibility: VisibilityHealth,
}

/// Visibility flag summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VisibilityHealth {
    /// Number of flags known to the cache.
    pub total: u32,
    /// Names of flags currently switched off.
    pub disabled: Vec<String>,
}

/// Health check endpoint.
///
/// Returns overall system health status.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "health"
)]
async fn health_check(
    State(state): State<AppState>,
) -> (axum::http::StatusCode, Json<HealthResponse>) {
    let db_healthy = state.db.is_healthy().await;
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let status = if db_healthy { "healthy" } else { "unhealthy" };
    let http_status = if db_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_healthy,
                pool_size: state.db.pool_size(),
                idle_connections: state.db.idle_connections(),
            },
            uptime_seconds: uptime,
            components: None,
        }),
    )
}

/// Detailed health check endpoint.
///
/// Adds a visibility flag summary, so operators can see at a glance which
/// sign-in surfaces are currently switched off.
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses(
        (status = 200, description = "Detailed system health", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "health"
)]
async fn health_check_detailed(
    State(state): State<AppState>,
) -> (axum::http::StatusCode, Json<HealthResponse>) {
    let db_healthy = state.db.is_healthy().await;
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let flags = state.visibility.list().await;
    let disabled: Vec<String> = flags
        .iter()
        .filter(|f| !f.enabled)
        .map(|f| f.name.clone())
        .collect();

    let status = determine_overall_status(db_healthy, disabled.len() as u32);

    // 503 only when the database is down; disabled flags are deliberate.
    let http_status = if db_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_healthy,
                pool_size: state.db.pool_size(),
                idle_connections: state.db.idle_connections(),
            },
            uptime_seconds: uptime,
            components: Some(ComponentsHealth {
                visibility: VisibilityHealth {
                    total: flags.len() as u32,
                    disabled,
                },
            }),
        }),
    )
}

/// Determine overall system status based on component health.
fn determine_overall_status(db_healthy: bool, disabled_flags: u32) -> String {
    if !db_healthy {
        return "unhealthy".to_string();
    }

    if disabled_flags > 0 {
        return "restricted".to_string();
    }

    "healthy".to_string()
}

/// Kubernetes readiness probe.
///
/// Returns 200 if the service is ready to accept traffic.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 503, description = "Service is not ready")
    ),
    tag = "health"
)]
async fn readiness_check(State(state): State<AppState>) -> axum::http::StatusCode {
    if state.db.is_healthy().await {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Kubernetes liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = "health"
)]
async fn liveness_check() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}
