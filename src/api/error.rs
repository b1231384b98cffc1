use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AuthError, PermitError};

/// Non-standard status surfaced when a session was superseded by a newer
/// login; clients treat it like 401 but show a dedicated message.
pub const SESSION_REVOKED_STATUS: u16 = 440;

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    /// Tagged with the failing field ("email" | "password").
    InvalidCredentials(&'static str),

    NotAuthenticated,

    SessionRevoked,

    AccessDenied,

    NotFound(String),

    InvalidOrExpiredToken,

    InvalidTransition(String),

    NotApproved,

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::InvalidCredentials(field) => write!(f, "Invalid {}", field),
            ApiError::NotAuthenticated => write!(f, "Not authenticated"),
            ApiError::SessionRevoked => write!(f, "Session revoked"),
            ApiError::AccessDenied => write!(f, "Access denied"),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidOrExpiredToken => write!(f, "Invalid or expired token"),
            ApiError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            ApiError::NotApproved => write!(f, "Permit is not approved"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, field, error_message) = match &self {
            ApiError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, None, None, msg.clone())
            }
            ApiError::InvalidCredentials(f) => (
                StatusCode::BAD_REQUEST,
                None,
                Some(*f),
                "Invalid credentials".to_string(),
            ),
            ApiError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                None,
                None,
                "Not authenticated".to_string(),
            ),
            ApiError::SessionRevoked => (
                StatusCode::from_u16(SESSION_REVOKED_STATUS)
                    .unwrap_or(StatusCode::UNAUTHORIZED),
                Some("SESSION_REVOKED"),
                None,
                "This account was used on another device".to_string(),
            ),
            ApiError::AccessDenied => (
                StatusCode::FORBIDDEN,
                None,
                None,
                "Access denied".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, None, msg.clone()),
            ApiError::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                Some("INVALID_OR_EXPIRED_TOKEN"),
                None,
                "Invalid or expired reset token".to_string(),
            ),
            ApiError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, None, None, msg.clone())
            }
            ApiError::NotApproved => (
                StatusCode::FORBIDDEN,
                None,
                None,
                "Permit is not approved".to_string(),
            ),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    None,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    None,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut body = ApiResponse::<()>::error(error_message);
        body.code = code.map(str::to_string);
        body.field = field.map(str::to_string);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials { field } => {
                ApiError::InvalidCredentials(field.as_str())
            }
            AuthError::NotAuthenticated => ApiError::NotAuthenticated,
            AuthError::InvalidOrExpiredToken => ApiError::InvalidOrExpiredToken,
            AuthError::Validation(msg) => ApiError::ValidationError(msg),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<PermitError> for ApiError {
    fn from(err: PermitError) -> Self {
        match err {
            PermitError::NotFound => ApiError::NotFound("Permit not found".to_string()),
            PermitError::Validation(msg) => ApiError::ValidationError(msg),
            PermitError::InvalidTransition { .. } => ApiError::InvalidTransition(err.to_string()),
            PermitError::NotApproved => ApiError::NotApproved,
            PermitError::Database(msg) => ApiError::DatabaseError(msg),
            PermitError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
