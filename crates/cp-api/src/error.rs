//! API error types and HTTP response mapping.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use cp_core::db::DbError;
use cp_core::visibility::VisibilityError;

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Validation failed")]
    ValidationError(ValidationErrorDetails),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session expired")]
    SessionExpired,

    #[error("CSRF validation failed")]
    CsrfValidationFailed,

    #[error("Account is disabled")]
    AccountDisabled,
}

/// Structured field-level validation failures.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationErrorDetails {
    pub message: String,
    pub fields: HashMap<String, Vec<FieldError>>,
}

/// A single validation failure on one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl ValidationErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    /// Single-field failure.
    pub fn field(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut details = Self::new("Validation failed");
        details.add_error(field, code, message);
        details
    }

    pub fn add_error(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.fields.entry(field.into()).or_default().push(FieldError {
            code: code.into(),
            message: message.into(),
            params: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl ApiError {
    /// Shorthand for a single-field validation error.
    pub fn validation_field(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ApiError::ValidationError(ValidationErrorDetails::field(field, code, message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::SessionExpired => StatusCode::UNAUTHORIZED,
            ApiError::CsrfValidationFailed => StatusCode::FORBIDDEN,
            ApiError::AccountDisabled => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::RateLimitExceeded(_) => "RATE_LIMIT_EXCEEDED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::SessionExpired => "SESSION_EXPIRED",
            ApiError::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            ApiError::AccountDisabled => "ACCOUNT_DISABLED",
        }
    }
}

/// Wire shape for error responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details (validation failures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Request id for correlation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "request rejected");
        }

        let details = match &self {
            ApiError::ValidationError(details) => serde_json::to_value(details).ok(),
            _ => None,
        };

        // Internal messages are not leaked to clients.
        let message = match &self {
            ApiError::Internal(_) => "An internal error occurred".to_string(),
            ApiError::Database(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details,
            request_id: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id {}", entity, id))
            }
            DbError::Constraint(msg) => ApiError::Conflict(msg),
            DbError::Serialization(msg) => ApiError::BadRequest(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<VisibilityError> for ApiError {
    fn from(err: VisibilityError) -> Self {
        match err {
            VisibilityError::NotFound(name) => {
                ApiError::NotFound(format!("Visibility flag '{}'", name))
            }
            VisibilityError::Storage(msg) => ApiError::Database(msg),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = ValidationErrorDetails::new("Validation failed");

        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                details.add_error(field.to_string(), error.code.to_string(), message);
            }
        }

        ApiError::ValidationError(details)
    }
}
