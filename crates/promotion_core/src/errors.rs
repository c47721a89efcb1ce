//! Promotion domain error types.
//!
//! Every fallible operation of the crate returns one of these errors. The
//! service-level [`PromotionError`] is what callers (the HTTP layer, the
//! execution queue) match on to decide how to report a failure.

use thiserror::Error;

use crate::status::{InvalidTransition, PromotionStatus};
use crate::types::PromotionId;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Input validation failures.
///
/// Raised before any state is touched, so a validation error never leaves a
/// partially modified promotion behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' is too long: {actual} characters (maximum {max})")]
    TooLong {
        field: String,
        actual: usize,
        max: usize,
    },

    #[error("Field '{field}' has an invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }

    pub fn too_long(field: impl Into<String>, actual: usize, max: usize) -> Self {
        Self::TooLong {
            field: field.into(),
            actual,
            max,
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Self::EmptyField { field }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. } => field,
        }
    }
}

/// Failures reported by an external collaborator (configuration service, smoke
/// test harness).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {message}")]
    Unavailable { message: String },

    #[error("Collaborator rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response from collaborator: {message}")]
    InvalidResponse { message: String },
}

/// Failures reported by a [`crate::PromotionStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Promotion request not found: {id}")]
    NotFound { id: PromotionId },

    #[error("Promotion request already exists: {id}")]
    AlreadyExists { id: PromotionId },

    #[error("Promotion request {id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        id: PromotionId,
        expected: u64,
        actual: u64,
    },

    #[error("Diffs of promotion request {id} are read-only in status {status}")]
    DiffsFrozen {
        id: PromotionId,
        status: PromotionStatus,
    },

    #[error("Storage backend failure: {message}")]
    Backend { message: String },
}

/// Errors returned by [`crate::PromotionService`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromotionError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Promotion request not found: {id}")]
    NotFound { id: String },

    #[error("Cannot {operation} a promotion request in status {status}")]
    InvalidState {
        status: PromotionStatus,
        operation: String,
    },

    #[error("Promotion request {id} was modified concurrently (expected version {expected}, found {actual}); re-read and retry")]
    ConcurrentModification {
        id: PromotionId,
        expected: u64,
        actual: u64,
    },

    #[error("Configuration collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Promotion store failed: {message}")]
    Store { message: String },
}

impl From<InvalidTransition> for PromotionError {
    fn from(err: InvalidTransition) -> Self {
        Self::InvalidState {
            status: err.from,
            operation: err.event.to_string(),
        }
    }
}

impl From<StoreError> for PromotionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id: id.to_string() },
            StoreError::VersionConflict {
                id,
                expected,
                actual,
            } => Self::ConcurrentModification {
                id,
                expected,
                actual,
            },
            StoreError::DiffsFrozen { status, .. } => Self::InvalidState {
                status,
                operation: "recalculate diffs of".to_string(),
            },
            other @ (StoreError::AlreadyExists { .. } | StoreError::Backend { .. }) => {
                Self::Store {
                    message: other.to_string(),
                }
            }
        }
    }
}

/// Result type alias for promotion operations.
pub type PromotionResult<T> = Result<T, PromotionError>;
