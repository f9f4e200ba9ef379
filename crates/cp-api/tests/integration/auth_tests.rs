//! Login flow and account endpoint integration tests.
//!
//! These run against the full server router, so the session layer, CSRF
//! round-trip, and cookie handling are all exercised for real.

use crate::common::{
    create_test_app, get_request, post_form_request, post_json_request, send_request,
    send_request_full, send_request_raw,
};
use axum::http::{header, StatusCode};
use axum::Router;
use cp_api::state::AppState;
use cp_core::auth::password::hash_password;
use cp_core::db::create_user_repository;
use cp_core::{Role, User};
use serde_json::Value;

const PASSWORD: &str = "Testpass1";

/// Seeds an enabled account directly through the repository layer.
async fn seed_user(state: &AppState, email: &str, role: Role) -> User {
    let hash = hash_password(PASSWORD).expect("Failed to hash password");
    let user = User::new(email, "Integration User", &hash, role);
    create_user_repository(&state.db)
        .create(&user)
        .await
        .expect("Failed to create user")
}

/// Pulls the session cookie pair out of a response.
fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("cp_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Pulls the hidden CSRF token out of the rendered login page.
fn csrf_token(html: &str) -> String {
    html.split("name=\"csrf_token\" value=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .expect("Login page should embed a CSRF token")
        .to_string()
}

/// GET /login and return (cookie, csrf token) ready for a submission.
async fn begin_login(app: &Router) -> (String, String) {
    let response = send_request_full(app.clone(), get_request("/login")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("Login page should start a session");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let token = csrf_token(&String::from_utf8_lossy(&body));
    (cookie, token)
}

fn login_form(email: &str, password: &str, token: &str) -> String {
    serde_urlencoded::to_string([
        ("email", email),
        ("password", password),
        ("csrf_token", token),
    ])
    .expect("Failed to encode form")
}

#[tokio::test]
async fn test_login_page_renders_with_csrf_token() {
    let (app, _state) = create_test_app().await;

    let (status, body) = send_request_raw(app, get_request("/login")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("action=\"/login\""));
    assert!(body.contains("name=\"csrf_token\""));
    assert!(!body.contains("Invalid"));
}

#[tokio::test]
async fn test_full_login_flow_redirects_to_role_dashboard() {
    let (app, state) = create_test_app().await;
    seed_user(&state, "prof.iyer@sitpune.edu.in", Role::Faculty).await;

    let (cookie, token) = begin_login(&app).await;
    let form = login_form("prof.iyer@sitpune.edu.in", PASSWORD, &token);
    let response =
        send_request_full(app.clone(), post_form_request("/login", &cookie, &form)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/faculty/dashboard")
    );

    // The authenticated cookie (rotated at login) now unlocks /auth/me.
    let cookie = session_cookie(&response).unwrap_or(cookie);
    let me_request = axum::extract::Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::COOKIE, &cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let me_response = send_request_full(app, me_request).await;
    assert_eq!(me_response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(me_response.into_body(), usize::MAX)
        .await
        .unwrap();
    let me: Value = serde_json::from_slice(&body).expect("Expected JSON");
    assert_eq!(me["email"], "prof.iyer@sitpune.edu.in");
    assert_eq!(me["role"], "faculty");
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let (app, state) = create_test_app().await;
    seed_user(&state, "prof.iyer@sitpune.edu.in", Role::Faculty).await;

    let (cookie, token) = begin_login(&app).await;
    let form = login_form("prof.iyer@sitpune.edu.in", "WrongPass9", &token);
    let (status, body) =
        send_request_raw(app, post_form_request("/login", &cookie, &form)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Invalid email or password."));
}

#[tokio::test]
async fn test_login_without_session_is_rejected() {
    let (app, state) = create_test_app().await;
    seed_user(&state, "prof.iyer@sitpune.edu.in", Role::Faculty).await;

    // No prior GET /login, so no session and no stored token.
    let form = login_form("prof.iyer@sitpune.edu.in", PASSWORD, "bogus-token");
    let (status, body) = send_request_raw(app, post_form_request("/login", "", &form)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Session expired. Please refresh and try again."));
}

#[tokio::test]
async fn test_login_rejects_mismatched_csrf_token() {
    let (app, state) = create_test_app().await;
    seed_user(&state, "prof.iyer@sitpune.edu.in", Role::Faculty).await;

    let (cookie, _token) = begin_login(&app).await;
    let form = login_form("prof.iyer@sitpune.edu.in", PASSWORD, "forged-token");
    let (status, body) =
        send_request_raw(app, post_form_request("/login", &cookie, &form)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Invalid request. Please try again."));
}

#[tokio::test]
async fn test_login_honours_disabled_student_flag() {
    let (app, state) = create_test_app().await;
    seed_user(&state, "asha.rao.btech23@sitpune.edu.in", Role::Student).await;
    state
        .visibility
        .set_enabled(cp_core::visibility::STUDENT_LOGIN, false)
        .await
        .expect("Failed to disable flag");

    let (cookie, token) = begin_login(&app).await;
    let form = login_form("asha.rao.btech23@sitpune.edu.in", PASSWORD, &token);
    let (status, body) =
        send_request_raw(app, post_form_request("/login", &cookie, &form)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Student sign-in is currently disabled."));
}

#[tokio::test]
async fn test_register_creates_guest_account() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/auth/register",
            r#"{"email": "visitor@gmail.com", "name": "Visiting Speaker", "password": "Guestpass1"}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "visitor@gmail.com");
    assert_eq!(body["user"]["role"], "guest");
}

#[tokio::test]
async fn test_register_rejects_institute_email() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) = send_request(
        app,
        post_json_request(
            "/api/v1/auth/register",
            r#"{"email": "someone@sitpune.edu.in", "name": "Someone", "password": "Guestpass1"}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_me_requires_session() {
    let (app, _state) = create_test_app().await;

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/api/v1/auth/me")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_logout_redirects_to_login() {
    let (app, _state) = create_test_app().await;

    let request = axum::extract::Request::builder()
        .method(axum::http::Method::POST)
        .uri("/logout")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send_request_full(app, request).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/login")
    );
}
