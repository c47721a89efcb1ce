//! Error types for configuration service client operations.

use promotion_core::CollaboratorError;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while talking to the configuration service.
#[derive(Debug, thiserror::Error)]
pub enum ConfigClientError {
    /// The configured base URL cannot be used to build request URLs.
    #[error("Invalid configuration service URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The request could not be sent or no response was received.
    #[error("Request to configuration service failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Configuration service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("Failed to deserialize configuration service response: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl From<ConfigClientError> for CollaboratorError {
    fn from(err: ConfigClientError) -> Self {
        match err {
            ConfigClientError::Status { status, body } => CollaboratorError::Rejected {
                status,
                message: body,
            },
            ConfigClientError::Request(e) if e.is_decode() => CollaboratorError::InvalidResponse {
                message: e.to_string(),
            },
            ConfigClientError::Request(e) => CollaboratorError::Unavailable {
                message: e.to_string(),
            },
            other @ (ConfigClientError::InvalidBaseUrl { .. }
            | ConfigClientError::Deserialization(_)) => CollaboratorError::InvalidResponse {
                message: other.to_string(),
            },
        }
    }
}
