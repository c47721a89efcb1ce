//! HTTP response type definitions
//!
//! HTTP response types are built from domain types via `From` and use
//! camelCase for JSON serialization.

use chrono::{DateTime, Utc};
use promotion_core::{
    ChangeType, ConfigDiff, DiffSummary, PromotionRequest, PromotionStatistics, PromotionStatus,
};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// A promotion request as returned by the API.
///
/// `diffs` is only present on `GET /promotions/{id}`.
///
/// # Example
///
/// ```json
/// {
///   "id": "7d0f2c4e-5b7a-4c43-9a59-0f1f7f9c2b10",
///   "applicationId": "billing",
///   "sourceEnvironment": "staging",
///   "targetEnvironment": "production",
///   "status": "PENDING_APPROVAL",
///   "requestedBy": "alice",
///   "includeAllConfigs": true,
///   "configKeys": [],
///   "smokeTestEnabled": false,
///   "createdAt": "2025-11-12T10:30:00Z",
///   "version": 1
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionResponse {
    pub id: String,
    pub application_id: String,
    pub source_environment: String,
    pub target_environment: String,
    pub status: PromotionStatus,
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
    pub config_keys: Vec<String>,
    pub smoke_test_enabled: bool,
    pub smoke_test_result: Option<serde_json::Value>,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffs: Option<Vec<DiffResponse>>,
}

impl PromotionResponse {
    /// Attach the diffs of the request.
    pub fn with_diffs(mut self, diffs: &[ConfigDiff]) -> Self {
        self.diffs = Some(diffs.iter().map(DiffResponse::from).collect());
        self
    }
}

impl From<&PromotionRequest> for PromotionResponse {
    fn from(request: &PromotionRequest) -> Self {
        Self {
            id: request.id.to_string(),
            application_id: request.application_id.to_string(),
            source_environment: request.source_environment.to_string(),
            target_environment: request.target_environment.to_string(),
            status: request.status(),
            requested_by: request.requested_by.clone(),
            approved_by: request.approved_by.clone(),
            approval_reason: request.approval_reason.clone(),
            rejected_by: request.rejected_by.clone(),
            rejection_reason: request.rejection_reason.clone(),
            created_at: request.created_at,
            approved_at: request.approved_at,
            rejected_at: request.rejected_at,
            completed_at: request.completed_at,
            rolled_back_at: request.rolled_back_at,
            updated_at: request.updated_at,
            error_message: request.error_message.clone(),
            include_all_configs: request.include_all_configs,
            config_keys: request.config_keys.iter().cloned().collect(),
            smoke_test_enabled: request.smoke_test_enabled,
            smoke_test_result: request.smoke_test_result.clone(),
            version: request.version,
            diffs: None,
        }
    }
}

impl From<PromotionRequest> for PromotionResponse {
    fn from(request: PromotionRequest) -> Self {
        Self::from(&request)
    }
}

/// One key's classified change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub config_key: String,
    pub source_value: Option<String>,
    pub target_value: Option<String>,
    pub source_type: Option<String>,
    pub target_type: Option<String>,
    pub source_version: u32,
    pub target_version: u32,
    pub change_type: ChangeType,
}

impl From<&ConfigDiff> for DiffResponse {
    fn from(diff: &ConfigDiff) -> Self {
        Self {
            config_key: diff.config_key().to_string(),
            source_value: diff.source_value().map(str::to_string),
            target_value: diff.target_value().map(str::to_string),
            source_type: diff.source_type().map(str::to_string),
            target_type: diff.target_type().map(str::to_string),
            source_version: diff.source_version(),
            target_version: diff.target_version(),
            change_type: diff.change_type(),
        }
    }
}

/// Counts of a diff set per change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummaryResponse {
    pub total: usize,
    pub new_configs: usize,
    pub modified: usize,
    pub deleted: usize,
    pub same: usize,
}

impl From<DiffSummary> for DiffSummaryResponse {
    fn from(summary: DiffSummary) -> Self {
        Self {
            total: summary.total,
            new_configs: summary.new_configs,
            modified: summary.modified,
            deleted: summary.deleted,
            same: summary.same,
        }
    }
}

/// Result of `POST /promotions/preview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDiffsResponse {
    pub diffs: Vec<DiffResponse>,
    pub summary: DiffSummaryResponse,
}

impl From<&[ConfigDiff]> for PreviewDiffsResponse {
    fn from(diffs: &[ConfigDiff]) -> Self {
        Self {
            diffs: diffs.iter().map(DiffResponse::from).collect(),
            summary: DiffSummary::from_diffs(diffs).into(),
        }
    }
}

/// Number of promotion requests per status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionStatisticsResponse {
    pub pending: u64,
    pub approved: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub rolled_back: u64,
    pub total: u64,
}

impl From<PromotionStatistics> for PromotionStatisticsResponse {
    fn from(stats: PromotionStatistics) -> Self {
        Self {
            pending: stats.pending,
            approved: stats.approved,
            in_progress: stats.in_progress,
            completed: stats.completed,
            failed: stats.failed,
            rejected: stats.rejected,
            rolled_back: stats.rolled_back,
            total: stats.total,
        }
    }
}

/// Acknowledgement of `POST /promotions/{id}/execute/async`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionQueuedResponse {
    pub promotion_id: String,
    pub status: PromotionStatus,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("healthy")
    pub status: String,

    /// Crate version
    pub version: String,

    /// Timestamp of the check (ISO 8601)
    pub timestamp: String,
}
