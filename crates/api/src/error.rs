//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{FieldViolation, ValidationError};
use saga::{ErrorKind, SagaError};
use serde::Serialize;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A store or queue failure. The cause is logged, never returned.
    #[error("{0}")]
    Infrastructure(String),

    /// Anything else. The cause is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldViolation]>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match &self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                "Validation failed",
                Some(err.violations.as_slice()),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str(), None),
            ApiError::Infrastructure(cause) => {
                tracing::error!(error = %cause, "infrastructure error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error to perform process, check logs.",
                    None,
                )
            }
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected error, check logs.",
                    None,
                )
            }
        };

        (status, Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        match err {
            SagaError::Validation(validation) => ApiError::Validation(validation),
            err => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound(err.to_string()),
                ErrorKind::Infrastructure => ApiError::Infrastructure(err.to_string()),
                ErrorKind::Validation | ErrorKind::Unexpected => ApiError::Internal(err.to_string()),
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => ApiError::Internal(e.to_string()),
            err => ApiError::Infrastructure(err.to_string()),
        }
    }
}
