use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_AUTHENTICATED`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `GONE`, `CONFLICT`, `USERNAME_TAKEN`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "No file was submitted.")]
    pub message: String,
    /// Field-keyed validation messages, present for form validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
        }
    }
}

/// Application-level error type.
///
/// Authentication failures map to 403 rather than 401; existing clients rely
/// on that.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// Validation failure attributable to a single request field.
    FieldValidation {
        field: &'static str,
        message: String,
    },
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    Gone,
    Conflict(String),
    UsernameTaken,
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::FieldValidation { field, message } => {
                let mut body = ErrorBody::new("VALIDATION_ERROR", message.clone());
                body.fields = Some(BTreeMap::from([(field.to_string(), vec![message])]));
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::TokenMissing => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(
                    "NOT_AUTHENTICATED",
                    "Authentication credentials were not provided.",
                ),
            ),
            AppError::TokenInvalid => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("TOKEN_INVALID", "Invalid or expired token"),
            ),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new(
                    "INVALID_CREDENTIALS",
                    "Unable to log in with provided credentials.",
                ),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(
                    "PERMISSION_DENIED",
                    "You do not have permission to perform this action.",
                ),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::Gone => (
                StatusCode::GONE,
                ErrorBody::new("GONE", "This API version is no longer available"),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                ErrorBody::new("USERNAME_TAKEN", "Username is already taken"),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidId(_) => {
                AppError::NotFound("Not found.".into())
            }
            StorageError::SizeLimitExceeded { actual, limit } => AppError::FieldValidation {
                field: "content",
                message: crate::models::shared::file_size_message(actual, limit),
            },
            StorageError::IdExhausted(_) => AppError::Conflict(err.to_string()),
            StorageError::Io(e) => AppError::Internal(format!("Storage IO error: {e}")),
        }
    }
}
