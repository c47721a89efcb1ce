//! Promotion request state machine.
//!
//! The lifecycle is expressed as a pure function over ([`PromotionStatus`],
//! [`PromotionEvent`]) so every transition rule can be checked without a store.
//!
//! ```text
//! PENDING_APPROVAL --approve--> APPROVED --start--> IN_PROGRESS --complete--> COMPLETED
//!        |                                              |                         |
//!        +--reject--> REJECTED                          +--fail--> FAILED         +--roll back--> ROLLED_BACK
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::errors::ValidationError;

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;

/// Lifecycle state of a promotion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionStatus {
    PendingApproval,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

impl PromotionStatus {
    pub const ALL: [PromotionStatus; 7] = [
        PromotionStatus::PendingApproval,
        PromotionStatus::Approved,
        PromotionStatus::Rejected,
        PromotionStatus::InProgress,
        PromotionStatus::Completed,
        PromotionStatus::Failed,
        PromotionStatus::RolledBack,
    ];

    /// Wire and storage representation, e.g. `PENDING_APPROVAL`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionStatus::PendingApproval => "PENDING_APPROVAL",
            PromotionStatus::Approved => "APPROVED",
            PromotionStatus::Rejected => "REJECTED",
            PromotionStatus::InProgress => "IN_PROGRESS",
            PromotionStatus::Completed => "COMPLETED",
            PromotionStatus::Failed => "FAILED",
            PromotionStatus::RolledBack => "ROLLED_BACK",
        }
    }

    /// `true` for states no guarded event can leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PromotionStatus::Rejected | PromotionStatus::Failed | PromotionStatus::RolledBack
        )
    }
}

impl std::fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromotionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        PromotionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown status '{s}'"))
            })
    }
}

/// Events that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionEvent {
    Approve,
    Reject,
    Start,
    Complete,
    Fail,
    RollBack,
}

impl std::fmt::Display for PromotionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PromotionEvent::Approve => "approve",
            PromotionEvent::Reject => "reject",
            PromotionEvent::Start => "start",
            PromotionEvent::Complete => "complete",
            PromotionEvent::Fail => "fail",
            PromotionEvent::RollBack => "roll back",
        };
        f.write_str(name)
    }
}

/// A guarded event was applied in a state that does not accept it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot {event} a promotion request in status {from}")]
pub struct InvalidTransition {
    pub from: PromotionStatus,
    pub event: PromotionEvent,
}

/// Compute the state reached by applying `event` in `state`.
///
/// `Fail` is unguarded and always leads to `FAILED`. Every other event is only
/// accepted in exactly one state.
pub fn transition(
    state: PromotionStatus,
    event: PromotionEvent,
) -> Result<PromotionStatus, InvalidTransition> {
    use PromotionEvent as E;
    use PromotionStatus as S;

    match (state, event) {
        (S::PendingApproval, E::Approve) => Ok(S::Approved),
        (S::PendingApproval, E::Reject) => Ok(S::Rejected),
        (S::Approved, E::Start) => Ok(S::InProgress),
        (S::InProgress, E::Complete) => Ok(S::Completed),
        (S::Completed, E::RollBack) => Ok(S::RolledBack),
        (_, E::Fail) => Ok(S::Failed),
        (from, event) => Err(InvalidTransition { from, event }),
    }
}
