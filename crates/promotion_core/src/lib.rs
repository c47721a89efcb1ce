//! # Promotion Core
//!
//! Domain logic for promoting configuration state from a source environment to a
//! target environment under human approval.
//!
//! ## Overview
//!
//! A promotion moves through a small, explicit state machine:
//! 1. A request is created in `PENDING_APPROVAL` together with an initial diff
//! 2. Diffs may be recalculated while the request waits for approval
//! 3. A reviewer approves or rejects the request
//! 4. Execution optionally runs smoke tests, then applies every stored diff
//! 5. A completed promotion can be rolled back from the stored diff snapshot
//!
//! ## Main Types
//!
//! - [`PromotionService`] - orchestrates every operation on a promotion request
//! - [`PromotionRequest`] - the aggregate, mutated only through guarded transitions
//! - [`compute_diffs`] - the pure diff engine
//! - [`transition`] - the pure state machine
//!
//! ## Architecture
//!
//! The service depends on traits only, so storage and the configuration service
//! can be swapped for tests:
//! - [`PromotionStore`] persists requests and their diffs with optimistic versioning
//! - [`ConfigSnapshotProvider`] reads the configuration of one environment
//! - [`ConfigWriter`] applies a single key change to one environment
//! - [`SmokeTestRunner`] vetoes execution before any change is applied
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use promotion_core::{
//!     AlwaysPassSmokeTestRunner, ConfigSnapshotProvider, ConfigWriter, InMemoryPromotionStore,
//!     NewPromotionRequest, PromotionService,
//! };
//!
//! # async fn example(
//! #     snapshots: Arc<dyn ConfigSnapshotProvider>,
//! #     writer: Arc<dyn ConfigWriter>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let service = PromotionService::new(
//!     Arc::new(InMemoryPromotionStore::new()),
//!     snapshots,
//!     writer,
//!     Arc::new(AlwaysPassSmokeTestRunner::new()),
//! );
//!
//! let request = service
//!     .create_promotion_request(NewPromotionRequest {
//!         application_id: "billing".to_string(),
//!         source_environment: "staging".to_string(),
//!         target_environment: "production".to_string(),
//!         requested_by: "alice".to_string(),
//!         include_all_configs: true,
//!         config_keys: Vec::new(),
//!         smoke_test_enabled: false,
//!     })
//!     .await?;
//!
//! service.approve_promotion(&request.id, "bob", Some("reviewed")).await?;
//! let promotion = service.execute_promotion(&request.id).await?;
//! println!("promotion {} finished as {}", promotion.id, promotion.status());
//! # Ok(())
//! # }
//! ```

pub mod collaborators;
pub mod diff;
pub mod errors;
pub mod metrics;
pub mod promotion;
pub mod queue;
pub mod service;
pub mod status;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use collaborators::{ConfigSnapshotProvider, ConfigWriter};
pub use diff::{
    compute_diffs, ChangeType, ConfigDiff, ConfigRecord, DiffSummary, KeyChange, Snapshot,
};
pub use errors::{CollaboratorError, PromotionError, PromotionResult, StoreError, ValidationError};
pub use metrics::{
    ExecutionOutcome, NoOpPromotionMetrics, PromotionMetrics, PrometheusPromotionMetrics,
};
pub use promotion::{NewPromotionRequest, PromotionRequest};
pub use queue::{ExecutionQueue, ExecutionWorker, QueueError, DEFAULT_QUEUE_CAPACITY};
pub use service::{PromotionService, PromotionStatistics};
pub use smoke_test::{
    AlwaysPassSmokeTestRunner, HttpSmokeTestRunner, ProbeResult, SmokeTestOutcome,
    SmokeTestRunner,
};
pub use status::{transition, InvalidTransition, PromotionEvent, PromotionStatus};
pub use store::{InMemoryPromotionStore, PromotionFilter, PromotionStore};
pub use types::{ApplicationId, EnvironmentName, PromotionId};
