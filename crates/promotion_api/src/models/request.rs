//! HTTP request type definitions
//!
//! HTTP request types accept loosely typed input (plain strings, optional
//! fields) and are validated while being translated to domain types in
//! [`crate::translation`].

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

/// Default limit for `GET /promotions/recent`
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Largest page `GET /promotions/recent` returns.
pub const MAX_RECENT_LIMIT: usize = 100;

/// Reason recorded when a rollback is requested without one
pub const DEFAULT_ROLLBACK_REASON: &str = "Manual rollback";

/// HTTP request to create a promotion request.
///
/// # Example
///
/// ```json
/// {
///   "applicationId": "billing",
///   "sourceEnvironment": "staging",
///   "targetEnvironment": "production",
///   "requestedBy": "alice",
///   "includeAllConfigs": false,
///   "configKeys": ["db.pool.size", "feature.checkout"],
///   "smokeTestEnabled": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromotionRequest {
    pub application_id: String,
    pub source_environment: String,
    pub target_environment: String,
    pub requested_by: String,
    pub include_all_configs: bool,
    #[serde(default)]
    pub config_keys: Vec<String>,
    pub smoke_test_enabled: bool,
}

/// HTTP request to approve a pending promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePromotionRequest {
    pub approved_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// HTTP request to reject a pending promotion. The reason is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectPromotionRequest {
    pub rejected_by: String,
    pub reason: String,
}

/// Query parameters of `GET /promotions`. Filters combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromotionsQuery {
    pub application_id: Option<String>,
    pub status: Option<String>,
    pub source_environment: Option<String>,
    pub target_environment: Option<String>,
}

/// Query parameters of `GET /promotions/recent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentPromotionsQuery {
    pub limit: Option<usize>,
}

impl RecentPromotionsQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .min(MAX_RECENT_LIMIT)
    }
}

/// Query parameters of `POST /promotions/{id}/rollback`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackQuery {
    pub reason: Option<String>,
}

impl RollbackQuery {
    /// The requested reason, or [`DEFAULT_ROLLBACK_REASON`] when none was given.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_ROLLBACK_REASON)
    }
}

/// HTTP request to preview the diffs between two environments.
///
/// An empty or missing `configKeys` compares every key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDiffsRequest {
    pub application_id: String,
    pub source_environment: String,
    pub target_environment: String,
    #[serde(default)]
    pub config_keys: Vec<String>,
}
