//! Promotion request aggregate.
//!
//! [`PromotionRequest`] holds the approval metadata and lifecycle state of one
//! promotion. Its status is private: every mutating method first asks
//! [`transition`] whether the event is allowed and only touches fields when it
//! is, so a rejected call leaves the request unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{PromotionResult, ValidationError};
use crate::status::{transition, PromotionEvent, PromotionStatus};
use crate::types::{
    optional_text, require_text, ApplicationId, EnvironmentName, PromotionId, MAX_NAME_LENGTH,
    MAX_REASON_LENGTH,
};

#[cfg(test)]
#[path = "promotion_tests.rs"]
mod tests;

/// Unvalidated input for creating a promotion request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPromotionRequest {
    pub application_id: String,
    pub source_environment: String,
    pub target_environment: String,
    pub requested_by: String,
    pub include_all_configs: bool,
    /// Keys to promote; only used when `include_all_configs` is `false`.
    pub config_keys: Vec<String>,
    pub smoke_test_enabled: bool,
}

/// A request to promote configuration from one environment to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRequest {
    pub id: PromotionId,
    pub application_id: ApplicationId,
    pub source_environment: EnvironmentName,
    pub target_environment: EnvironmentName,
    status: PromotionStatus,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub approval_reason: Option<String>,
    pub rejected_by: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rolled_back_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub include_all_configs: bool,
    pub config_keys: BTreeSet<String>,
    pub smoke_test_enabled: bool,
    pub smoke_test_result: Option<serde_json::Value>,
    /// Optimistic concurrency counter, owned by the store.
    pub version: u64,
}

impl PromotionRequest {
    /// Validate `draft` and build a request in `PENDING_APPROVAL`.
    ///
    /// # Errors
    /// Returns `ValidationError` when a required field is blank or too long,
    /// or when source and target are the same environment.
    pub fn new(draft: NewPromotionRequest) -> Result<Self, ValidationError> {
        let application_id = ApplicationId::new(draft.application_id)?;
        let source_environment =
            EnvironmentName::for_field("source_environment", draft.source_environment)?;
        let target_environment =
            EnvironmentName::for_field("target_environment", draft.target_environment)?;
        let requested_by = require_text("requested_by", draft.requested_by, MAX_NAME_LENGTH)?;

        if source_environment == target_environment {
            return Err(ValidationError::invalid_format(
                "target_environment",
                "must differ from the source environment",
            ));
        }

        let config_keys = if draft.include_all_configs {
            BTreeSet::new()
        } else {
            let mut keys = BTreeSet::new();
            for key in draft.config_keys {
                keys.insert(require_text("config_keys", key, MAX_NAME_LENGTH)?);
            }
            keys
        };

        let now = Utc::now();
        Ok(Self {
            id: PromotionId::new(),
            application_id,
            source_environment,
            target_environment,
            status: PromotionStatus::PendingApproval,
            requested_by,
            approved_by: None,
            approval_reason: None,
            rejected_by: None,
            rejection_reason: None,
            created_at: now,
            approved_at: None,
            rejected_at: None,
            completed_at: None,
            rolled_back_at: None,
            updated_at: now,
            error_message: None,
            include_all_configs: draft.include_all_configs,
            config_keys,
            smoke_test_enabled: draft.smoke_test_enabled,
            smoke_test_result: None,
            version: 0,
        })
    }

    pub fn status(&self) -> PromotionStatus {
        self.status
    }

    /// Keys the diff is restricted to, `None` when every key is promoted.
    /// An explicit selection without keys promotes every key.
    pub fn key_filter(&self) -> Option<&BTreeSet<String>> {
        if self.include_all_configs || self.config_keys.is_empty() {
            None
        } else {
            Some(&self.config_keys)
        }
    }

    /// Record approval by `approved_by`.
    pub fn approve(&mut self, approved_by: &str, reason: Option<&str>) -> PromotionResult<()> {
        let approved_by = require_text("approved_by", approved_by, MAX_NAME_LENGTH)?;
        let reason = optional_text("reason", reason, MAX_REASON_LENGTH)?;
        let next = transition(self.status, PromotionEvent::Approve)?;

        let now = Utc::now();
        self.status = next;
        self.approved_by = Some(approved_by);
        self.approval_reason = reason;
        self.approved_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Record rejection by `rejected_by`; a reason is mandatory.
    pub fn reject(&mut self, rejected_by: &str, reason: &str) -> PromotionResult<()> {
        let rejected_by = require_text("rejected_by", rejected_by, MAX_NAME_LENGTH)?;
        let reason = require_text("reason", reason, MAX_REASON_LENGTH)?;
        let next = transition(self.status, PromotionEvent::Reject)?;

        let now = Utc::now();
        self.status = next;
        self.rejected_by = Some(rejected_by);
        self.rejection_reason = Some(reason);
        self.rejected_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn start(&mut self) -> PromotionResult<()> {
        self.status = transition(self.status, PromotionEvent::Start)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> PromotionResult<()> {
        self.status = transition(self.status, PromotionEvent::Complete)?;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Move to `FAILED`, recording `message`. Accepted in every state.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status =
            transition(self.status, PromotionEvent::Fail).unwrap_or(PromotionStatus::Failed);
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// Mark a completed promotion as rolled back.
    pub fn roll_back(&mut self, reason: &str) -> PromotionResult<()> {
        let reason = require_text("reason", reason, MAX_REASON_LENGTH)?;
        let next = transition(self.status, PromotionEvent::RollBack)?;

        let now = Utc::now();
        self.status = next;
        self.error_message = Some(format!("Rolled back: {reason}"));
        self.rolled_back_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Attach the smoke-test result blob.
    pub fn record_smoke_test(&mut self, result: serde_json::Value) {
        self.smoke_test_result = Some(result);
        self.updated_at = Utc::now();
    }
}
