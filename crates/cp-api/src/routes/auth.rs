//! Authentication routes: the login form, logout, and the session API.

use askama::Template;
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tower_sessions::Session;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use cp_core::auth::SessionData;
use cp_core::db::create_user_repository;
use cp_core::visibility::{self, login_flag_for_role};
use cp_core::{
    hash_password, validate_password_strength, verify_password, Role, User, VisibilityFlags,
};
use cp_observability::LOGIN_ATTEMPTS_TOTAL;

use crate::auth::{clear_session, set_session_data, validate_csrf_token, AuthenticatedUser};
use crate::error::ApiError;
use crate::rate_limit::extract_client_ip;
use crate::state::AppState;
use crate::web::HtmlTemplate;

/// Session key holding the CSRF token issued with the login form.
const LOGIN_CSRF_KEY: &str = "login_csrf";

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub notice: Option<String>,
    pub csrf_token: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub csrf_token: String,
}

/// The signed-in account as seen by clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentUserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub branch: Option<String>,
}

impl From<User> for CurrentUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            branch: user.branch,
        }
    }
}

/// Guest self-registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Guest self-registration response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: CurrentUserResponse,
    pub message: String,
}

/// Creates the browser-facing auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route("/login", post(login_submit))
        .route("/logout", post(logout))
}

/// Creates the session API routes, nested under `/auth`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(current_user))
        .route("/register", post(register))
}

/// Renders the login page.
async fn login_page(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    // Generate a CSRF token for the form
    let csrf_token = crate::auth::generate_csrf_token();

    // Store it in the session (we'll use a simple key for unauthenticated sessions)
    let _ = session.insert(LOGIN_CSRF_KEY, &csrf_token).await;

    HtmlTemplate(LoginTemplate {
        error: None,
        notice: disabled_login_notice(&state.visibility),
        csrf_token,
    })
}

/// Handles login form submission.
async fn login_submit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    // Proxy headers take precedence; fall back to the socket address, then
    // loopback when the server runs without connect info (as in tests).
    let client_ip = extract_client_ip(&headers)
        .or(connect_info.map(|ConnectInfo(addr)| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    // Check rate limits first (before any other validation)
    if let Err(e) = state.login_rate_limiter.check(client_ip) {
        warn!(
            ip = %client_ip,
            email = %form.email,
            "Login rate limited"
        );
        return render_rate_limit_error(e.to_string(), &session).await;
    }

    // Validate CSRF token
    let stored_csrf: Option<String> = session.get(LOGIN_CSRF_KEY).await.ok().flatten();
    if let Some(stored) = &stored_csrf {
        if !validate_csrf_token(&form.csrf_token, stored) {
            warn!("CSRF validation failed for login attempt");
            return render_login_error("Invalid request. Please try again.".to_string(), &session)
                .await;
        }
    } else {
        return render_login_error(
            "Session expired. Please refresh and try again.".to_string(),
            &session,
        )
        .await;
    }

    // Clear the login CSRF token
    let _ = session.remove::<String>(LOGIN_CSRF_KEY).await;

    // Look up the account
    let email = form.email.trim().to_lowercase();
    let user_repo = create_user_repository(&state.db);
    let user = match user_repo.get_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(
                ip = %client_ip,
                email = %email,
                "Login attempt for unknown email"
            );
            counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => "failure").increment(1);
            return render_login_error("Invalid email or password.".to_string(), &session).await;
        }
        Err(e) => {
            warn!("Database error during login: {}", e);
            return render_login_error(
                "An error occurred. Please try again.".to_string(),
                &session,
            )
            .await;
        }
    };

    // Check if account is enabled
    if !user.enabled {
        warn!(
            ip = %client_ip,
            email = %user.email,
            "Login attempt for disabled account"
        );
        counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => "blocked").increment(1);
        return render_login_error("This account has been disabled.".to_string(), &session).await;
    }

    // Role-specific sign-in gates
    if let Some(flag) = login_flag_for_role(user.role) {
        if !state.visibility.is_enabled(flag) {
            info!(
                ip = %client_ip,
                email = %user.email,
                role = %user.role,
                "Login blocked by visibility flag"
            );
            counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => "blocked").increment(1);
            return render_login_error(login_disabled_message(user.role).to_string(), &session)
                .await;
        }
    }

    // Verify password
    match verify_password(&form.password, &user.password_hash) {
        Ok(true) => {
            // Password is correct
        }
        Ok(false) => {
            warn!(
                ip = %client_ip,
                email = %user.email,
                "Invalid password"
            );
            counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => "failure").increment(1);
            return render_login_error("Invalid email or password.".to_string(), &session).await;
        }
        Err(e) => {
            warn!("Password verification error: {}", e);
            return render_login_error(
                "An error occurred. Please try again.".to_string(),
                &session,
            )
            .await;
        }
    }

    // Regenerate the session ID after successful authentication so any
    // pre-authentication session ID is invalidated.
    if let Err(e) = session.cycle_id().await {
        warn!("Failed to regenerate session ID: {}", e);
    }

    // Store session data
    let session_data = SessionData::new(&user);
    if let Err(e) = set_session_data(&session, session_data).await {
        warn!("Failed to store session data: {}", e);
        return render_login_error("An error occurred. Please try again.".to_string(), &session)
            .await;
    }

    // Update last login timestamp
    let _ = user_repo.update_last_login(user.id).await;

    counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => "success").increment(1);
    info!(
        ip = %client_ip,
        email = %user.email,
        role = %user.role,
        "User logged in"
    );

    // Redirect to the role dashboard
    Redirect::to(user.role.home_path()).into_response()
}

/// Handles logout.
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_session(&session).await {
        warn!("Error clearing session during logout: {}", e);
    }

    info!("User logged out");

    Redirect::to("/login")
}

/// Returns the signed-in account.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "The signed-in account", body = CurrentUserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
async fn current_user(AuthenticatedUser(user): AuthenticatedUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse::from(user))
}

/// Registers a guest account.
///
/// Only external email addresses may self-register; institute accounts are
/// provisioned through roster imports and coordinator management.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Institute email address"),
        (status = 403, description = "Guest registration disabled"),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Validation failed")
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    if !state.visibility.is_enabled(visibility::GUEST_LOGIN) {
        return Err(ApiError::Forbidden(
            "Guest registration is currently disabled.".to_string(),
        ));
    }

    let email = request.email.trim().to_lowercase();
    if Role::classify_email(&email, &state.institute_domain) != Role::Guest {
        return Err(ApiError::BadRequest(
            "Institute accounts are provisioned separately. Registration is only for external guest email addresses.".to_string(),
        ));
    }

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation_field(
            "name",
            "length",
            "Name cannot be blank",
        ));
    }

    let strength_errors = validate_password_strength(&request.password);
    if !strength_errors.is_empty() {
        return Err(ApiError::validation_field(
            "password",
            "weak_password",
            strength_errors.join("; "),
        ));
    }

    let user_repo = create_user_repository(&state.db);
    if user_repo.get_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists.".to_string(),
        ));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;

    let user = User::new(&email, name, &password_hash, Role::Guest);
    let user = user_repo.create(&user).await?;

    info!(email = %user.email, "Guest account registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: CurrentUserResponse::from(user),
            message: "Account created. You can now sign in.".to_string(),
        }),
    ))
}

/// Builds the login page notice when any sign-in path is switched off.
fn disabled_login_notice(flags: &VisibilityFlags) -> Option<String> {
    let disabled: Vec<&str> = [
        (visibility::STUDENT_LOGIN, "Student"),
        (visibility::FACULTY_LOGIN, "Faculty"),
        (visibility::GUEST_LOGIN, "Guest"),
    ]
    .iter()
    .filter(|(flag, _)| !flags.is_enabled(flag))
    .map(|(_, label)| *label)
    .collect();

    match disabled.as_slice() {
        [] => None,
        [one] => Some(format!("{} sign-in is currently disabled.", one)),
        [a, b] => Some(format!("{} and {} sign-in are currently disabled.", a, b)),
        _ => Some("Student, faculty and guest sign-in are currently disabled.".to_string()),
    }
}

/// The error shown when a role's sign-in flag is off.
fn login_disabled_message(role: Role) -> &'static str {
    match role {
        Role::Student => "Student sign-in is currently disabled.",
        Role::Faculty => "Faculty sign-in is currently disabled.",
        Role::Guest => "Guest sign-in is currently disabled.",
        _ => "Sign-in is currently disabled.",
    }
}

/// Helper to render the login page with an error.
async fn render_login_error(error: String, session: &Session) -> Response {
    let csrf_token = crate::auth::generate_csrf_token();
    let _ = session.insert(LOGIN_CSRF_KEY, &csrf_token).await;

    HtmlTemplate(LoginTemplate {
        error: Some(error),
        notice: None,
        csrf_token,
    })
    .into_response()
}

/// Helper to render the login page with a rate limit error (429 status).
async fn render_rate_limit_error(error: String, session: &Session) -> Response {
    let csrf_token = crate::auth::generate_csrf_token();
    let _ = session.insert(LOGIN_CSRF_KEY, &csrf_token).await;

    let body = HtmlTemplate(LoginTemplate {
        error: Some(error),
        notice: None,
        csrf_token,
    })
    .into_response();

    (StatusCode::TOO_MANY_REQUESTS, body).into_response()
}
