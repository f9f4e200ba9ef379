//! Authentication and authorization.
//!
//! This module provides:
//! - Session-based authentication for the portal
//! - Role-based access control extractors
//! - CSRF protection for forms

pub mod csrf;
pub mod extractors;

#[cfg(test)]
pub mod test_helpers;

pub use csrf::{generate_csrf_token, validate_csrf_token, CsrfToken};
pub use extractors::{
    AuthenticatedUser, CurrentSession, OptionalUser, RequireAdmin, RequireCoordinator,
    RequireFaculty, RequireGuest, RequireStudent,
};

use tower_sessions::Session;

use cp_core::auth::SessionData;

/// Session key for storing user data.
pub const SESSION_USER_KEY: &str = "user";

/// Gets the session data from the session.
pub async fn get_session_data(session: &Session) -> Option<SessionData> {
    session
        .get::<SessionData>(SESSION_USER_KEY)
        .await
        .ok()
        .flatten()
}

/// Stores session data in the session.
pub async fn set_session_data(
    session: &Session,
    data: SessionData,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(SESSION_USER_KEY, data).await
}

/// Clears the session (logout).
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
