//! Health endpoint integration tests.

use crate::common::{create_test_app, get_request, send_request, send_request_raw};
use axum::http::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_health_endpoint_returns_healthy() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) = send_request(app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["connected"], true);
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
    // The summary view carries no component details.
    assert!(body.get("components").is_none());
}

#[tokio::test]
async fn test_detailed_health_lists_visibility_flags() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/health/detailed")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["visibility"]["total"], 4);
    assert_eq!(
        body["components"]["visibility"]["disabled"]
            .as_array()
            .expect("Expected disabled list")
            .len(),
        0
    );
}

#[tokio::test]
async fn test_detailed_health_reports_restricted_when_flag_off() {
    let (app, state) = create_test_app().await;
    state
        .visibility
        .set_enabled(cp_core::visibility::STUDENT_LOGIN, false)
        .await
        .expect("Failed to disable flag");

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/health/detailed")).await;

    // Deliberately disabled surfaces restrict the status but keep 200.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "restricted");
    assert_eq!(
        body["components"]["visibility"]["disabled"],
        serde_json::json!(["studentLogin"])
    );
}

#[tokio::test]
async fn test_readiness_probe() {
    let (app, _state) = create_test_app().await;

    let (status, _) = send_request_raw(app, get_request("/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_liveness_probe() {
    let (app, _state) = create_test_app().await;

    let (status, _) = send_request_raw(app, get_request("/live")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_degrades_without_recorder() {
    let (app, _state) = create_test_app().await;

    // The test state installs no Prometheus recorder.
    let (status, _body) = send_request_raw(app, get_request("/metrics")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
