//! Admin routes: coordinator account management and visibility flags.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use cp_core::auth::password::{hash_password, validate_password_strength};
use cp_core::db::create_user_repository;
use cp_core::{Role, User, UserFilter, UserUpdate, VisibilityFlag};

use crate::auth::RequireAdmin;
use crate::error::ApiError;
use crate::routes::coordinator::ToggleRequest;
use crate::state::AppState;

/// A coordinator account as listed to the admin.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CoordinatorResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub branch: Option<String>,
}

impl From<User> for CoordinatorResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            branch: user.branch,
        }
    }
}

/// Body for appointing a coordinator.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCoordinatorRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 16, message = "Branch must be 1-16 characters"))]
    pub branch: String,
}

/// Outcome of appointing a coordinator.
///
/// `generated_password` is present only when a brand-new account was
/// created, and is shown exactly once.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCoordinatorResponse {
    pub coordinator: CoordinatorResponse,
    pub generated_password: Option<String>,
    pub message: String,
}

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/coordinators", get(list_coordinators).post(create_coordinator))
        .route("/coordinators/:id", delete(remove_coordinator))
        .route("/toggles", get(list_toggles))
        .route("/toggles/:name", put(set_toggle))
}

/// Lists coordinator accounts, email ascending.
#[utoipa::path(
    get,
    path = "/api/v1/admin/coordinators",
    tag = "admin",
    responses(
        (status = 200, description = "Coordinator accounts", body = [CoordinatorResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
async fn list_coordinators(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<CoordinatorResponse>>, ApiError> {
    let repo = create_user_repository(&state.db);
    let mut coordinators = repo
        .list(&UserFilter {
            role: Some(Role::Coordinator),
            ..Default::default()
        })
        .await?;
    coordinators.sort_by(|a, b| a.email.cmp(&b.email));

    Ok(Json(
        coordinators.into_iter().map(CoordinatorResponse::from).collect(),
    ))
}

/// Appoints a branch coordinator.
///
/// An existing account is promoted in place and keeps its password. When
/// no account exists one is created with a generated password, returned
/// once in the response.
#[utoipa::path(
    post,
    path = "/api/v1/admin/coordinators",
    tag = "admin",
    request_body = CreateCoordinatorRequest,
    responses(
        (status = 200, description = "Existing account promoted", body = CreateCoordinatorResponse),
        (status = 201, description = "New account created", body = CreateCoordinatorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Account is already a coordinator"),
        (status = 422, description = "Validation failed")
    )
)]
async fn create_coordinator(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateCoordinatorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    let branch = body.branch.trim().to_uppercase();
    if branch.is_empty() {
        return Err(ApiError::validation_field(
            "branch",
            "required",
            "Branch must not be blank",
        ));
    }

    let repo = create_user_repository(&state.db);
    if let Some(existing) = repo.get_by_email(&email).await? {
        if existing.role == Role::Coordinator {
            return Err(ApiError::Conflict(
                "This account is already a coordinator".to_string(),
            ));
        }

        let promoted = repo
            .update(
                existing.id,
                &UserUpdate {
                    role: Some(Role::Coordinator),
                    branch: Some(Some(branch.clone())),
                    ..Default::default()
                },
            )
            .await?;
        info!(
            coordinator = %promoted.email,
            branch = %branch,
            admin = %admin.email,
            "Existing account promoted to coordinator"
        );

        return Ok((
            StatusCode::OK,
            Json(CreateCoordinatorResponse {
                coordinator: promoted.into(),
                generated_password: None,
                message: "Existing account promoted to coordinator. Its password is unchanged."
                    .to_string(),
            }),
        ));
    }

    let password = generate_password();
    let password_hash = hash_password(&password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;

    let mut account = User::new(
        &email,
        &format!("Coordinator {branch}"),
        &password_hash,
        Role::Coordinator,
    );
    account.branch = Some(branch.clone());
    let created = repo.create(&account).await?;
    info!(
        coordinator = %created.email,
        branch = %branch,
        admin = %admin.email,
        "Coordinator account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateCoordinatorResponse {
            coordinator: created.into(),
            generated_password: Some(password),
            message: "Coordinator account created. Share the generated password securely; it will not be shown again."
                .to_string(),
        }),
    ))
}

/// Revokes coordinator access, demoting the account to guest.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/coordinators/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Coordinator user id")),
    responses(
        (status = 204, description = "Coordinator access revoked"),
        (status = 400, description = "Attempted to remove own account"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No coordinator with this id")
    )
)]
async fn remove_coordinator(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if id == admin.id {
        return Err(ApiError::BadRequest(
            "Cannot remove your own account".to_string(),
        ));
    }

    let repo = create_user_repository(&state.db);
    let target = repo
        .get(id)
        .await?
        .filter(|user| user.role == Role::Coordinator)
        .ok_or_else(|| ApiError::NotFound("Coordinator not found".to_string()))?;

    let demoted = repo
        .update(
            target.id,
            &UserUpdate {
                role: Some(Role::Guest),
                branch: Some(None),
                ..Default::default()
            },
        )
        .await?;
    info!(
        coordinator = %demoted.email,
        admin = %admin.email,
        "Coordinator access revoked"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every visibility flag.
#[utoipa::path(
    get,
    path = "/api/v1/admin/toggles",
    tag = "admin",
    responses(
        (status = 200, description = "All flags, name ascending", body = [VisibilityFlag]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
async fn list_toggles(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<Vec<VisibilityFlag>> {
    Json(state.visibility.list().await)
}

/// Sets a visibility flag, creating it when unknown.
#[utoipa::path(
    put,
    path = "/api/v1/admin/toggles/{name}",
    tag = "admin",
    params(("name" = String, Path, description = "Flag name, e.g. studentLogin")),
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Updated flag", body = VisibilityFlag),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    )
)]
async fn set_toggle(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(name): Path<String>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<VisibilityFlag>, ApiError> {
    let flag = state.visibility.set_enabled(&name, body.enabled).await?;
    info!(
        flag = %name,
        enabled = body.enabled,
        admin = %admin.email,
        "Visibility flag updated"
    );
    Ok(Json(flag))
}

/// Random password that satisfies the strength rules.
fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate: String = (&mut rng)
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        if validate_password_strength(&candidate).is_empty() {
            return candidate;
        }
    }
}
