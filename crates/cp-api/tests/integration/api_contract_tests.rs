//! API contract tests: routing, auth gating, and response conventions.

use crate::common::{create_test_app, get_request, send_request, send_request_full};
use axum::http::{header, Method, StatusCode};
use serde_json::Value;

/// Every role-gated endpoint must answer 401 to an anonymous request,
/// never 404 and never a 500 from a missing session.
#[tokio::test]
async fn test_protected_endpoints_require_authentication() {
    let endpoints = [
        (Method::GET, "/api/v1/campaigns"),
        (Method::GET, "/api/v1/campaigns/faculty/questions"),
        (Method::GET, "/api/v1/student/profile"),
        (Method::GET, "/api/v1/student/pending-feedback"),
        (Method::POST, "/api/v1/student/feedback"),
        (Method::POST, "/api/v1/student/curriculum-feedback"),
        (Method::POST, "/api/v1/guest/feedback"),
        (Method::GET, "/api/v1/faculty/profile"),
        (Method::GET, "/api/v1/faculty/ratings"),
        (Method::GET, "/api/v1/faculty/remarks"),
        (Method::GET, "/api/v1/coordinator/overview"),
        (Method::GET, "/api/v1/coordinator/reports/outstanding"),
        (Method::GET, "/api/v1/coordinator/students"),
        (Method::GET, "/api/v1/admin/coordinators"),
        (Method::GET, "/api/v1/admin/toggles"),
        (Method::GET, "/api/v1/auth/me"),
    ];

    for (method, uri) in endpoints {
        let (app, _state) = create_test_app().await;
        let request = axum::extract::Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let response = send_request_full(app, request).await;

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require authentication"
        );
    }
}

/// The unversioned /api prefix remains routable for older clients.
#[tokio::test]
async fn test_legacy_api_prefix_is_routable() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/api/campaigns")).await;

    // 401 proves the route exists; a missing route would 404.
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, _state) = create_test_app().await;

    let response = send_request_full(app, get_request("/api/v1/no-such-thing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Error bodies always carry machine-readable `code` and human `message`.
#[tokio::test]
async fn test_error_body_shape() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/api/v1/auth/me")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["code"].is_string());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Campus Pulse API");
    assert!(body["paths"]["/api/v1/student/feedback"].is_object());
    assert!(body["paths"]["/api/v1/coordinator/reports/outstanding"].is_object());
}

#[tokio::test]
async fn test_security_headers_are_applied() {
    let (app, _state) = create_test_app().await;

    let response = send_request_full(app, get_request("/health")).await;

    let headers = response.headers();
    assert_eq!(
        headers
            .get(header::X_CONTENT_TYPE_OPTIONS)
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
    assert_eq!(
        headers
            .get(header::X_FRAME_OPTIONS)
            .and_then(|v| v.to_str().ok()),
        Some("DENY")
    );
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
}

#[tokio::test]
async fn test_request_id_header_is_set() {
    let (app, _state) = create_test_app().await;

    let response = send_request_full(app, get_request("/health")).await;
    assert!(response.headers().contains_key("x-request-id"));
}
