use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// The error taxonomy collapsed onto HTTP status codes. Variant kinds
/// mirror the taxonomy rather than naming implementation types, so every
/// internal error surfaces through exactly one mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("queue full")]
    QueueFull,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::QueueFull => "queue_full",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<pipeworks_registry::RegistryError> for ApiError {
    fn from(e: pipeworks_registry::RegistryError) -> Self {
        match e {
            pipeworks_registry::RegistryError::Validation(m) => ApiError::Validation(m),
            pipeworks_registry::RegistryError::NotFound(m) => ApiError::NotFound(m),
            pipeworks_registry::RegistryError::Conflict(m) => ApiError::Conflict(m),
            pipeworks_registry::RegistryError::LockTimeout(m) => ApiError::Unavailable(format!("lock timeout: {m}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<pipeworks_queue::QueueError> for ApiError {
    fn from(e: pipeworks_queue::QueueError) -> Self {
        match e {
            pipeworks_queue::QueueError::QueueFull => ApiError::QueueFull,
            pipeworks_queue::QueueError::NotFound(m) => ApiError::NotFound(m),
            pipeworks_queue::QueueError::AlreadyTerminal(m) => ApiError::Conflict(m),
            pipeworks_queue::QueueError::Conflict(m) => ApiError::Conflict(m),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody { code: self.code().to_string(), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
