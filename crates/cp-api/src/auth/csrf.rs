//! CSRF (Cross-Site Request Forgery) protection.
//!
//! Token generation and validation for form submissions.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use rand::Rng;
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use super::get_session_data;
use crate::error::ApiError;

/// The CSRF token bound to the current session.
///
/// Extracting this yields the token stored in `SessionData`; handlers compare
/// it against whatever the client submitted.
pub struct CsrfToken(pub String);

impl CsrfToken {
    pub fn value(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CsrfToken
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

        Ok(CsrfToken(session_data.csrf_token))
    }
}

/// Generates a new CSRF token.
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Validates a CSRF token against the expected value.
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn validate_csrf_token(submitted: &str, expected: &str) -> bool {
    if submitted.len() != expected.len() {
        return false;
    }
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Picks the CSRF token from a form field or the `X-CSRF-Token` header.
pub fn extract_csrf_from_form_or_header<'a>(
    form_token: Option<&'a str>,
    header_token: Option<&'a str>,
) -> Option<&'a str> {
    form_token.or(header_token)
}
