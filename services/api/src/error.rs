//! API error types and JSON error response formatting.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use interview_core::{InterviewError, ValidationError};
use serde::{Deserialize, Serialize};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "conflict", "not_found").
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - the request itself is unusable.
    BadRequest(String),
    /// 404 - no such session.
    NotFound(String),
    /// 409 - the session is not in a state that allows the operation.
    Conflict(String),
    /// 502 - the AI provider failed or answered nonsense.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyMessage | ValidationError::InvalidField { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            _ => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<InterviewError> for ApiError {
    fn from(err: InterviewError) -> Self {
        match err {
            InterviewError::Validation(validation) => validation.into(),
            remote => {
                tracing::error!("Remote failure: {}", remote);
                ApiError::BadGateway(remote.to_string())
            }
        }
    }
}
