//! Axum extractors for authentication and authorization.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use cp_core::auth::{Role, SessionData};
use cp_core::db::create_user_repository;
use cp_core::User;

use crate::error::ApiError;
use crate::state::AppState;

use super::get_session_data;

/// Extractor for authenticated users.
///
/// Resolves the session, reloads the user row, and rejects disabled
/// accounts. Returns 401 when no valid session is present.
///
/// # Example
///
/// ```ignore
/// async fn protected_endpoint(
///     AuthenticatedUser(user): AuthenticatedUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display())
/// }
/// ```
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // In tests, check for injected test user first
        #[cfg(test)]
        {
            if let Some(test_user) = parts.extensions.get::<super::test_helpers::TestUser>() {
                return Ok(AuthenticatedUser(test_user.0.clone()));
            }
        }

        let app_state = AppState::from_ref(state);

        if let Ok(session) = Session::from_request_parts(parts, state).await {
            if let Some(session_data) = get_session_data(&session).await {
                // Reload from the database so role or enabled changes take
                // effect without waiting for the session to expire.
                let user_repo = create_user_repository(&app_state.db);
                if let Ok(Some(user)) = user_repo.get(session_data.user_id).await {
                    if !user.enabled {
                        return Err(ApiError::AccountDisabled);
                    }
                    return Ok(AuthenticatedUser(user));
                }
            }
        }

        Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        ))
    }
}

/// Extractor for optional authentication.
///
/// Never fails; yields `None` when the request is unauthenticated.
pub struct OptionalUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        #[cfg(test)]
        {
            if let Some(test_user) = parts.extensions.get::<super::test_helpers::TestUser>() {
                return Ok(OptionalUser(Some(test_user.0.clone())));
            }
        }

        let app_state = AppState::from_ref(state);

        if let Ok(session) = Session::from_request_parts(parts, state).await {
            if let Some(session_data) = get_session_data(&session).await {
                let user_repo = create_user_repository(&app_state.db);
                if let Ok(Some(user)) = user_repo.get(session_data.user_id).await {
                    if user.enabled {
                        return Ok(OptionalUser(Some(user)));
                    }
                }
            }
        }

        Ok(OptionalUser(None))
    }
}

/// Generates an extractor that requires a specific role.
///
/// Each extractor delegates to [`AuthenticatedUser`] and then checks
/// `has_permission`, so admins pass every gate while other roles only
/// match their own.
macro_rules! define_role_extractor {
    ($name:ident, $role:expr, $label:literal, $doc:literal) => {
        #[doc = $doc]
        pub struct $name(pub User);

        #[async_trait]
        impl<S> FromRequestParts<S> for $name
        where
            AppState: FromRef<S>,
            S: Send + Sync,
        {
            type Rejection = ApiError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &S,
            ) -> Result<Self, Self::Rejection> {
                let AuthenticatedUser(user) =
                    AuthenticatedUser::from_request_parts(parts, state).await?;

                if !user.has_permission($role) {
                    return Err(ApiError::Forbidden(format!(
                        "{} access required",
                        $label
                    )));
                }

                Ok($name(user))
            }
        }
    };
}

define_role_extractor!(
    RequireAdmin,
    Role::Admin,
    "Admin",
    "Extractor that requires the admin role."
);

define_role_extractor!(
    RequireCoordinator,
    Role::Coordinator,
    "Coordinator",
    "Extractor that requires the coordinator role (or admin)."
);

define_role_extractor!(
    RequireFaculty,
    Role::Faculty,
    "Faculty",
    "Extractor that requires the faculty role (or admin)."
);

define_role_extractor!(
    RequireStudent,
    Role::Student,
    "Student",
    "Extractor that requires the student role (or admin)."
);

define_role_extractor!(
    RequireGuest,
    Role::Guest,
    "Guest",
    "Extractor that requires the guest role (or admin)."
);

/// Extractor for session data without loading the full user.
///
/// Useful for lightweight checks or reading the CSRF token.
pub struct CurrentSession(pub SessionData);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::SessionExpired)?;

        let session_data = get_session_data(&session)
            .await
            .ok_or(ApiError::SessionExpired)?;

        Ok(CurrentSession(session_data))
    }
}
