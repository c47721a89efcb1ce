//! Persistence of promotion requests and their diffs.
//!
//! A [`PromotionStore`] owns the optimistic `version` of every request: each
//! successful write bumps it by one, and a write carrying a stale version fails
//! with [`StoreError::VersionConflict`] without changing anything. The diff set
//! of a request is replaced as a whole and only while the request is
//! `PENDING_APPROVAL`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::diff::ConfigDiff;
use crate::errors::StoreError;
use crate::promotion::PromotionRequest;
use crate::status::PromotionStatus;
use crate::types::PromotionId;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Criteria for listing promotion requests. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionFilter {
    pub application_id: Option<String>,
    pub status: Option<PromotionStatus>,
    pub source_environment: Option<String>,
    pub target_environment: Option<String>,
}

impl PromotionFilter {
    pub fn matches(&self, request: &PromotionRequest) -> bool {
        self.application_id
            .as_deref()
            .map_or(true, |id| request.application_id.as_str() == id)
            && self.status.map_or(true, |status| request.status() == status)
            && self
                .source_environment
                .as_deref()
                .map_or(true, |env| request.source_environment.as_str() == env)
            && self
                .target_environment
                .as_deref()
                .map_or(true, |env| request.target_environment.as_str() == env)
    }
}

/// Durable storage for promotion requests.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Insert a new request with its initial diffs. The stored request gets
    /// version 1 and is returned.
    async fn insert(
        &self,
        request: &PromotionRequest,
        diffs: &[ConfigDiff],
    ) -> Result<PromotionRequest, StoreError>;

    async fn get(&self, id: &PromotionId) -> Result<PromotionRequest, StoreError>;

    /// Persist `request` if the stored version still equals `request.version`.
    /// Returns the stored request with its incremented version.
    async fn save(&self, request: &PromotionRequest) -> Result<PromotionRequest, StoreError>;

    /// Swap the whole diff set of `id` in one transaction.
    ///
    /// Fails with `VersionConflict` when the stored version differs from
    /// `expected_version` and with `DiffsFrozen` when the request is no longer
    /// `PENDING_APPROVAL`.
    async fn replace_diffs(
        &self,
        id: &PromotionId,
        expected_version: u64,
        diffs: &[ConfigDiff],
    ) -> Result<PromotionRequest, StoreError>;

    /// Stored diffs of `id` in key order.
    async fn diffs(&self, id: &PromotionId) -> Result<Vec<ConfigDiff>, StoreError>;

    /// Requests matching `filter`, newest first.
    async fn list(&self, filter: &PromotionFilter) -> Result<Vec<PromotionRequest>, StoreError>;

    /// The `limit` most recently created requests, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<PromotionRequest>, StoreError>;

    /// Number of stored requests per status. Statuses without requests may be
    /// missing from the map.
    async fn count_by_status(&self) -> Result<BTreeMap<PromotionStatus, u64>, StoreError>;
}

#[derive(Default)]
struct InMemoryState {
    requests: HashMap<PromotionId, PromotionRequest>,
    diffs: HashMap<PromotionId, Vec<ConfigDiff>>,
}

/// [`PromotionStore`] kept in process memory. Used for tests and for running
/// the service without a database.
#[derive(Default)]
pub struct InMemoryPromotionStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryPromotionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(requests: &mut [PromotionRequest]) {
    requests.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl PromotionStore for InMemoryPromotionStore {
    async fn insert(
        &self,
        request: &PromotionRequest,
        diffs: &[ConfigDiff],
    ) -> Result<PromotionRequest, StoreError> {
        let mut state = self.state.write().await;
        if state.requests.contains_key(&request.id) {
            return Err(StoreError::AlreadyExists {
                id: request.id.clone(),
            });
        }

        let mut stored = request.clone();
        stored.version = 1;
        state.requests.insert(stored.id.clone(), stored.clone());
        state.diffs.insert(stored.id.clone(), diffs.to_vec());
        Ok(stored)
    }

    async fn get(&self, id: &PromotionId) -> Result<PromotionRequest, StoreError> {
        let state = self.state.read().await;
        state
            .requests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })
    }

    async fn save(&self, request: &PromotionRequest) -> Result<PromotionRequest, StoreError> {
        let mut state = self.state.write().await;
        let current = state
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| StoreError::NotFound {
                id: request.id.clone(),
            })?;

        if current.version != request.version {
            return Err(StoreError::VersionConflict {
                id: request.id.clone(),
                expected: request.version,
                actual: current.version,
            });
        }

        let mut stored = request.clone();
        stored.version = request.version + 1;
        *current = stored.clone();
        Ok(stored)
    }

    async fn replace_diffs(
        &self,
        id: &PromotionId,
        expected_version: u64,
        diffs: &[ConfigDiff],
    ) -> Result<PromotionRequest, StoreError> {
        let mut state = self.state.write().await;
        let current = state
            .requests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;

        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        if current.status() != PromotionStatus::PendingApproval {
            return Err(StoreError::DiffsFrozen {
                id: id.clone(),
                status: current.status(),
            });
        }

        current.version += 1;
        current.updated_at = Utc::now();
        let stored = current.clone();
        state.diffs.insert(id.clone(), diffs.to_vec());
        Ok(stored)
    }

    async fn diffs(&self, id: &PromotionId) -> Result<Vec<ConfigDiff>, StoreError> {
        let state = self.state.read().await;
        if !state.requests.contains_key(id) {
            return Err(StoreError::NotFound { id: id.clone() });
        }
        Ok(state.diffs.get(id).cloned().unwrap_or_default())
    }

    async fn list(&self, filter: &PromotionFilter) -> Result<Vec<PromotionRequest>, StoreError> {
        let state = self.state.read().await;
        let mut requests: Vec<PromotionRequest> = state
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        newest_first(&mut requests);
        Ok(requests)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PromotionRequest>, StoreError> {
        let mut requests = self.list(&PromotionFilter::default()).await?;
        requests.truncate(limit);
        Ok(requests)
    }

    async fn count_by_status(&self) -> Result<BTreeMap<PromotionStatus, u64>, StoreError> {
        let state = self.state.read().await;
        let mut counts = BTreeMap::new();
        for request in state.requests.values() {
            *counts.entry(request.status()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
