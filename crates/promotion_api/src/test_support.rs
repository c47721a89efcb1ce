//! Shared fixtures for handler and server tests.

use config_client::InMemoryConfigStore;
use prometheus::Registry;
use promotion_core::{
    AlwaysPassSmokeTestRunner, ConfigWriter, ExecutionQueue, InMemoryPromotionStore, PrometheusPromotionMetrics,
    PromotionService, DEFAULT_QUEUE_CAPACITY,
};
use std::sync::Arc;

use crate::AppState;

/// Application state backed by in-memory stores, with the execution worker
/// running on the current runtime.
pub fn test_app_state() -> (AppState, Arc<InMemoryConfigStore>) {
    test_app_state_with_writer(|config| config)
}

/// Like [`test_app_state`], with the writer derived from the configuration
/// store.
pub fn test_app_state_with_writer(
    writer: impl FnOnce(Arc<InMemoryConfigStore>) -> Arc<dyn ConfigWriter>,
) -> (AppState, Arc<InMemoryConfigStore>) {
    let config = Arc::new(InMemoryConfigStore::new());
    let registry = Registry::new();
    let metrics = PrometheusPromotionMetrics::new(&registry).unwrap();

    let service = Arc::new(
        PromotionService::new(
            Arc::new(InMemoryPromotionStore::new()),
            config.clone(),
            writer(config.clone()),
            Arc::new(AlwaysPassSmokeTestRunner::new()),
        )
        .with_metrics(Arc::new(metrics)),
    );
    let (queue, _worker) = ExecutionQueue::start(service.clone(), DEFAULT_QUEUE_CAPACITY);

    (AppState::new(service, queue, registry), config)
}
