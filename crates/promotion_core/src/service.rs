//! Promotion orchestration.
//!
//! [`PromotionService`] is the single entry point for every promotion
//! operation. Validation and invalid-state errors are returned to the caller
//! before anything is written. Failures while executing a promotion are
//! captured on the request itself (`FAILED` plus an error message) so callers
//! poll the returned request instead of relying on an error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::collaborators::{apply_key_change, ConfigSnapshotProvider, ConfigWriter};
use crate::diff::{compute_diffs, ConfigDiff, DiffSummary};
use crate::errors::{PromotionError, PromotionResult};
use crate::metrics::{ExecutionOutcome, NoOpPromotionMetrics, PromotionMetrics};
use crate::promotion::{NewPromotionRequest, PromotionRequest};
use crate::smoke_test::{SmokeTestOutcome, SmokeTestRunner};
use crate::status::{transition, PromotionEvent, PromotionStatus};
use crate::store::{PromotionFilter, PromotionStore};
use crate::types::{require_text, ApplicationId, EnvironmentName, PromotionId, MAX_NAME_LENGTH};

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

/// Number of promotion requests per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStatistics {
    pub pending: u64,
    pub approved: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub rolled_back: u64,
    pub total: u64,
}

impl PromotionStatistics {
    fn from_counts(counts: &BTreeMap<PromotionStatus, u64>) -> Self {
        let count = |status| counts.get(&status).copied().unwrap_or(0);
        Self {
            pending: count(PromotionStatus::PendingApproval),
            approved: count(PromotionStatus::Approved),
            in_progress: count(PromotionStatus::InProgress),
            completed: count(PromotionStatus::Completed),
            failed: count(PromotionStatus::Failed),
            rejected: count(PromotionStatus::Rejected),
            rolled_back: count(PromotionStatus::RolledBack),
            total: counts.values().sum(),
        }
    }
}

/// Orchestrates creation, approval, execution and rollback of promotions.
pub struct PromotionService {
    store: Arc<dyn PromotionStore>,
    snapshots: Arc<dyn ConfigSnapshotProvider>,
    writer: Arc<dyn ConfigWriter>,
    smoke_tests: Arc<dyn SmokeTestRunner>,
    metrics: Arc<dyn PromotionMetrics>,
}

impl PromotionService {
    pub fn new(
        store: Arc<dyn PromotionStore>,
        snapshots: Arc<dyn ConfigSnapshotProvider>,
        writer: Arc<dyn ConfigWriter>,
        smoke_tests: Arc<dyn SmokeTestRunner>,
    ) -> Self {
        Self {
            store,
            snapshots,
            writer,
            smoke_tests,
            metrics: Arc::new(NoOpPromotionMetrics::new()),
        }
    }

    /// Replace the metrics recorder (no-op by default).
    pub fn with_metrics(mut self, metrics: Arc<dyn PromotionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    async fn snapshot_diffs(
        &self,
        application: &ApplicationId,
        source: &EnvironmentName,
        target: &EnvironmentName,
        key_filter: Option<&BTreeSet<String>>,
    ) -> PromotionResult<Vec<ConfigDiff>> {
        let source_snapshot = self.snapshots.snapshot(application, source).await?;
        let target_snapshot = self.snapshots.snapshot(application, target).await?;
        Ok(compute_diffs(&source_snapshot, &target_snapshot, key_filter))
    }

    /// Create a request in `PENDING_APPROVAL` together with its initial diffs.
    ///
    /// The request is only stored once both snapshots have been read, so a
    /// failing configuration service leaves nothing behind.
    pub async fn create_promotion_request(
        &self,
        draft: NewPromotionRequest,
    ) -> PromotionResult<PromotionRequest> {
        let request = PromotionRequest::new(draft)?;
        let diffs = self
            .snapshot_diffs(
                &request.application_id,
                &request.source_environment,
                &request.target_environment,
                request.key_filter(),
            )
            .await?;

        let stored = self.store.insert(&request, &diffs).await?;
        self.metrics.record_request_created();

        info!(
            promotion_id = %stored.id,
            application_id = %stored.application_id,
            source_environment = %stored.source_environment,
            target_environment = %stored.target_environment,
            requested_by = %stored.requested_by,
            diff_count = diffs.len(),
            "Created promotion request"
        );
        Ok(stored)
    }

    /// Recompute the diffs of a pending request from fresh snapshots and
    /// replace the stored set.
    ///
    /// # Errors
    /// `InvalidState` once the request has left `PENDING_APPROVAL`; the stored
    /// diffs are read-only from then on.
    pub async fn calculate_diffs(&self, id: &PromotionId) -> PromotionResult<Vec<ConfigDiff>> {
        let request = self.store.get(id).await?;
        if request.status() != PromotionStatus::PendingApproval {
            return Err(PromotionError::InvalidState {
                status: request.status(),
                operation: "recalculate diffs of".to_string(),
            });
        }

        let diffs = self
            .snapshot_diffs(
                &request.application_id,
                &request.source_environment,
                &request.target_environment,
                request.key_filter(),
            )
            .await?;
        self.store
            .replace_diffs(id, request.version, &diffs)
            .await?;

        info!(promotion_id = %id, diff_count = diffs.len(), "Recalculated promotion diffs");
        Ok(diffs)
    }

    /// Compute the diffs a request would get without storing anything.
    ///
    /// An empty `config_keys` list selects every key.
    pub async fn preview_diffs(
        &self,
        application_id: &str,
        source_environment: &str,
        target_environment: &str,
        config_keys: &[String],
    ) -> PromotionResult<Vec<ConfigDiff>> {
        let application = ApplicationId::new(application_id)?;
        let source = EnvironmentName::for_field("source_environment", source_environment)?;
        let target = EnvironmentName::for_field("target_environment", target_environment)?;
        let keys = config_keys
            .iter()
            .map(|key| require_text("config_keys", key.as_str(), MAX_NAME_LENGTH))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let filter = (!keys.is_empty()).then_some(&keys);

        self.snapshot_diffs(&application, &source, &target, filter)
            .await
    }

    pub async fn approve_promotion(
        &self,
        id: &PromotionId,
        approved_by: &str,
        reason: Option<&str>,
    ) -> PromotionResult<PromotionRequest> {
        let mut request = self.store.get(id).await?;
        request.approve(approved_by, reason)?;
        let saved = self.store.save(&request).await?;

        info!(promotion_id = %id, approved_by = approved_by, "Promotion approved");
        Ok(saved)
    }

    pub async fn reject_promotion(
        &self,
        id: &PromotionId,
        rejected_by: &str,
        reason: &str,
    ) -> PromotionResult<PromotionRequest> {
        let mut request = self.store.get(id).await?;
        request.reject(rejected_by, reason)?;
        let saved = self.store.save(&request).await?;

        warn!(
            promotion_id = %id,
            rejected_by = rejected_by,
            reason = reason,
            "Promotion rejected"
        );
        Ok(saved)
    }

    /// Check that `id` exists and may be executed now, without changing it.
    pub async fn ensure_executable(&self, id: &PromotionId) -> PromotionResult<PromotionRequest> {
        let request = self.store.get(id).await?;
        transition(request.status(), PromotionEvent::Start)?;
        Ok(request)
    }

    /// Execute an approved promotion.
    ///
    /// Moves the request to `IN_PROGRESS`, runs the smoke-test gate when
    /// enabled, then applies every stored diff to the target environment in key
    /// order. The returned request is `COMPLETED` or `FAILED`; a failure while
    /// applying reverts the keys already written by this run.
    ///
    /// # Errors
    /// `InvalidState` when the request is not `APPROVED` (nothing is contacted),
    /// `ConcurrentModification` when another caller started it first.
    pub async fn execute_promotion(&self, id: &PromotionId) -> PromotionResult<PromotionRequest> {
        let mut request = self.store.get(id).await?;
        request.start()?;
        let diffs = self.store.diffs(id).await?;
        let request = self.store.save(&request).await?;

        self.metrics.increment_in_flight();
        let result = self.run_execution(request, &diffs).await;
        self.metrics.decrement_in_flight();
        result
    }

    async fn run_execution(
        &self,
        mut request: PromotionRequest,
        diffs: &[ConfigDiff],
    ) -> PromotionResult<PromotionRequest> {
        let summary = DiffSummary::from_diffs(diffs);
        info!(
            promotion_id = %request.id,
            target_environment = %request.target_environment,
            changes = summary.changes(),
            smoke_test_enabled = request.smoke_test_enabled,
            "Executing promotion"
        );

        if request.smoke_test_enabled {
            let outcome = match self.smoke_tests.run(&request).await {
                Ok(outcome) => outcome,
                Err(e) => SmokeTestOutcome::failed(format!("Smoke tests could not be run: {e}")),
            };
            request.record_smoke_test(outcome.to_result_blob());

            if !outcome.passed {
                warn!(
                    promotion_id = %request.id,
                    summary = %outcome.summary,
                    "Smoke tests failed, no changes applied"
                );
                request.fail(format!("Smoke tests failed: {}", outcome.summary));
                let saved = self.store.save(&request).await?;
                self.metrics
                    .record_execution(ExecutionOutcome::SmokeTestFailed);
                return Ok(saved);
            }
            request = self.store.save(&request).await?;
        }

        let mut applied: Vec<&ConfigDiff> = Vec::new();
        for diff in diffs {
            let Some(change) = diff.forward_change() else {
                continue;
            };

            debug!(
                promotion_id = %request.id,
                key = diff.config_key(),
                change_type = %diff.change_type(),
                "Applying configuration change"
            );
            if let Err(e) =
                apply_key_change(self.writer.as_ref(), &request.target_environment, &change).await
            {
                error!(
                    promotion_id = %request.id,
                    key = diff.config_key(),
                    error = %e,
                    "Failed to apply configuration change"
                );
                let message = format!(
                    "Failed to apply {} change for key '{}': {e}",
                    diff.change_type(),
                    diff.config_key()
                );
                request.fail(message.clone());
                let persisted = self.store.save(&request).await;

                // Applied keys are reverted even when the FAILED state could not be stored.
                let compensation = self.compensate(&request, &applied).await;
                let mut failed = match persisted {
                    Ok(failed) => failed,
                    Err(e) => {
                        error!(
                            promotion_id = %request.id,
                            error = %e,
                            compensation = %compensation,
                            "Failed to record execution failure"
                        );
                        self.metrics.record_execution(ExecutionOutcome::Failed);
                        return Err(e.into());
                    }
                };
                failed.fail(format!("{message}; {compensation}"));
                let saved = self.store.save(&failed).await?;
                self.metrics.record_execution(ExecutionOutcome::Failed);
                return Ok(saved);
            }
            applied.push(diff);
        }

        request.complete()?;
        let saved = self.store.save(&request).await?;
        self.metrics.record_execution(ExecutionOutcome::Completed);

        info!(
            promotion_id = %saved.id,
            applied = applied.len(),
            "Promotion completed"
        );
        Ok(saved)
    }

    /// Revert `applied` in reverse order, best effort. Returns a note for the
    /// request's error message.
    async fn compensate(&self, request: &PromotionRequest, applied: &[&ConfigDiff]) -> String {
        if applied.is_empty() {
            return "no changes had been applied".to_string();
        }

        let mut failures = Vec::new();
        for diff in applied.iter().rev() {
            let Some(change) = diff.reverse_change() else {
                continue;
            };
            if let Err(e) =
                apply_key_change(self.writer.as_ref(), &request.target_environment, &change).await
            {
                warn!(
                    promotion_id = %request.id,
                    key = diff.config_key(),
                    error = %e,
                    "Failed to revert configuration change"
                );
                failures.push(format!("'{}' ({e})", diff.config_key()));
            }
        }

        if failures.is_empty() {
            format!("reverted {} applied change(s)", applied.len())
        } else {
            format!(
                "could not revert {} of {} applied change(s): {}",
                failures.len(),
                applied.len(),
                failures.join(", ")
            )
        }
    }

    /// Restore the target environment of a completed promotion from its stored
    /// diffs, newest key first.
    ///
    /// # Errors
    /// `InvalidState` unless the request is `COMPLETED`. A writer failure is
    /// returned as `Collaborator` and the request stays `COMPLETED` so the
    /// rollback can be retried.
    pub async fn rollback_promotion(
        &self,
        id: &PromotionId,
        reason: &str,
    ) -> PromotionResult<PromotionRequest> {
        let request = self.store.get(id).await?;
        let mut rolled_back = request.clone();
        rolled_back.roll_back(reason)?;

        let diffs = self.store.diffs(id).await?;
        for diff in diffs.iter().rev() {
            let Some(change) = diff.reverse_change() else {
                continue;
            };

            debug!(
                promotion_id = %id,
                key = diff.config_key(),
                change_type = %diff.change_type(),
                "Reverting configuration change"
            );
            if let Err(e) =
                apply_key_change(self.writer.as_ref(), &request.target_environment, &change).await
            {
                error!(
                    promotion_id = %id,
                    key = diff.config_key(),
                    error = %e,
                    "Rollback failed, promotion stays completed"
                );
                return Err(e.into());
            }
        }

        let saved = self.store.save(&rolled_back).await?;
        self.metrics.record_rollback();

        info!(promotion_id = %id, reason = reason, "Promotion rolled back");
        Ok(saved)
    }

    pub async fn get_promotion(&self, id: &PromotionId) -> PromotionResult<PromotionRequest> {
        Ok(self.store.get(id).await?)
    }

    pub async fn get_promotion_with_diffs(
        &self,
        id: &PromotionId,
    ) -> PromotionResult<(PromotionRequest, Vec<ConfigDiff>)> {
        let request = self.store.get(id).await?;
        let diffs = self.store.diffs(id).await?;
        Ok((request, diffs))
    }

    pub async fn get_diffs(&self, id: &PromotionId) -> PromotionResult<Vec<ConfigDiff>> {
        Ok(self.store.diffs(id).await?)
    }

    pub async fn diff_summary(&self, id: &PromotionId) -> PromotionResult<DiffSummary> {
        let diffs = self.store.diffs(id).await?;
        Ok(DiffSummary::from_diffs(&diffs))
    }

    pub async fn list_promotions(
        &self,
        filter: &PromotionFilter,
    ) -> PromotionResult<Vec<PromotionRequest>> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn recent_promotions(&self, limit: usize) -> PromotionResult<Vec<PromotionRequest>> {
        Ok(self.store.recent(limit).await?)
    }

    pub async fn statistics(&self) -> PromotionResult<PromotionStatistics> {
        let counts = self.store.count_by_status().await?;
        Ok(PromotionStatistics::from_counts(&counts))
    }
}
