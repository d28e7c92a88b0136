// API-wide error handling utilities
// One taxonomy for all handlers: validation, auth, ownership, transition,
// and upstream-dependency failures, each with a stable code and HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use thiserror::Error;

use crate::models::invoice::TransitionError;
use crate::models::user::UserError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    // Ownership mismatches answer 404 rather than 403 so that probing a
    // foreign invoice id does not reveal its existence.
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Email delivery error: {0}")]
    Email(String),

    #[error("Internal server error")]
    Internal,
}

/// Standard error response structure
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub description: String,
}

impl ApiError {
    /// Convert to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::AccountInactive => StatusCode::FORBIDDEN,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidToken => StatusCode::BAD_REQUEST,
            ApiError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Email(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::AccountInactive => "ACCOUNT_INACTIVE",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Email(_) => "EMAIL_ERROR",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        // Upstream-dependency details go to the log, not the client
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error_code = self.error_code(), "Request failed: {}", self);
        }

        let response = ApiErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.error_code().to_string(),
                description: self.to_string(),
            },
            message: self.to_string(),
        };

        (status, Json(response)).into_response()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => ApiError::NotFound,
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => ApiError::NotFound,
            UserError::EmailTaken => ApiError::Validation("Email already registered".to_string()),
            UserError::DatabaseError(msg) => ApiError::Database(msg),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::InvalidTransition(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Standard success envelope returned by every handler
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: String::new(),
        })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: message.into(),
        })
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn message_only(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_miss_maps_to_404() {
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_token_errors_stay_generic() {
        // Expired and unknown tokens must be indistinguishable to the caller
        let err = ApiError::InvalidToken;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid or expired token");
    }

    #[test]
    fn test_transition_rejection_is_400() {
        let err = ApiError::InvalidTransition("already verified".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_diesel_not_found_conversion() {
        let err: ApiError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, ApiError::NotFound));
    }
}
