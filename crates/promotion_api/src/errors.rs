//! Error handling and HTTP error conversion
//!
//! Domain errors from `promotion_core` are converted to HTTP responses with a
//! fixed JSON envelope. The conversion happens at the HTTP boundary and never
//! exposes storage internals to clients.
//!
//! | Domain error                | Status | Code                     |
//! |-----------------------------|--------|--------------------------|
//! | `Validation`                | 400    | `ValidationError`        |
//! | `NotFound`                  | 404    | `NotFound`               |
//! | `InvalidState`              | 409    | `InvalidState`           |
//! | `ConcurrentModification`    | 409    | `ConcurrentModification` |
//! | `Collaborator`              | 502    | `CollaboratorError`      |
//! | `Store`                     | 500    | `InternalError`          |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promotion_core::{PromotionError, QueueError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinError;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Standard error response for all API errors.
///
/// All error responses follow this consistent structure to provide
/// machine-readable error codes and human-readable messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional context (optional, shape varies by error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            error: ErrorDetails {
                code: code.into(),
                message: message.into(),
                details,
            },
        }
    }
}

/// Error returned by every handler.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<PromotionResponse>, ApiError> {
///     let request = state.service.get_promotion(&id).await?; // PromotionError -> ApiError
///     Ok(Json(request.into()))
/// }
/// ```
#[derive(Debug)]
pub enum ApiError {
    /// A failure raised by the promotion service
    Promotion(PromotionError),

    /// Malformed HTTP input that never reached the service
    Validation { field: String, message: String },

    /// The background execution queue cannot take more work
    QueueUnavailable(QueueError),

    /// A detached execution task panicked or was cancelled
    Task(JoinError),
}

impl ApiError {
    /// Create a validation error with field information
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error for a promotion id
    pub fn not_found(id: impl Into<String>) -> Self {
        ApiError::Promotion(PromotionError::NotFound { id: id.into() })
    }
}

impl From<PromotionError> for ApiError {
    fn from(err: PromotionError) -> Self {
        ApiError::Promotion(err)
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        ApiError::QueueUnavailable(err)
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Task(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Promotion(err) => write!(f, "{}", err),
            ApiError::Validation { field, message } => {
                write!(f, "validation error in field {}: {}", field, message)
            }
            ApiError::QueueUnavailable(err) => write!(f, "{}", err),
            ApiError::Task(err) => write!(f, "execution task failed: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::Promotion(err) => convert_promotion_error(err),
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    "ValidationError",
                    message.clone(),
                    Some(json!({ "field": field })),
                ),
            ),
            ApiError::QueueUnavailable(err) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("ServiceUnavailable", err.to_string(), None),
            ),
            ApiError::Task(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("InternalError", "An internal error occurred", None),
            ),
        };

        log_error(&self, status);

        (status, Json(error_response)).into_response()
    }
}

/// Convert a promotion service error to an HTTP status code and error response.
pub fn convert_promotion_error(error: &PromotionError) -> (StatusCode, ErrorResponse) {
    match error {
        PromotionError::Validation(err) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(
                "ValidationError",
                err.to_string(),
                Some(json!({ "field": err.field() })),
            ),
        ),
        PromotionError::NotFound { id } => (
            StatusCode::NOT_FOUND,
            ErrorResponse::new(
                "NotFound",
                error.to_string(),
                Some(json!({ "id": id })),
            ),
        ),
        PromotionError::InvalidState { status, operation } => (
            StatusCode::CONFLICT,
            ErrorResponse::new(
                "InvalidState",
                error.to_string(),
                Some(json!({ "status": status.as_str(), "operation": operation })),
            ),
        ),
        PromotionError::ConcurrentModification {
            id,
            expected,
            actual,
        } => (
            StatusCode::CONFLICT,
            ErrorResponse::new(
                "ConcurrentModification",
                error.to_string(),
                Some(json!({
                    "id": id.to_string(),
                    "expectedVersion": expected,
                    "actualVersion": actual
                })),
            ),
        ),
        PromotionError::Collaborator(_) => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::new("CollaboratorError", error.to_string(), None),
        ),
        PromotionError::Store { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("InternalError", "An internal error occurred", None),
        ),
    }
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &ApiError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(status = %status, error = %error, "API error");
    } else {
        tracing::warn!(status = %status, error = %error, "API error");
    }
}
