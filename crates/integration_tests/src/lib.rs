//! Integration testing library for the promotion engine.
//!
//! [`TestEnvironment`] wires the real crates together: the promotion service
//! on top of an on-disk SQLite store, an in-process configuration store and
//! the HTTP router. Scenarios in `tests/` drive it either through the service
//! or through HTTP requests.

pub mod fixtures;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use config_client::InMemoryConfigStore;
use prometheus::Registry;
use promotion_api::{create_router, AppState};
use promotion_core::{
    AlwaysPassSmokeTestRunner, ConfigWriter, ExecutionQueue, PrometheusPromotionMetrics,
    PromotionService, SmokeTestRunner, DEFAULT_QUEUE_CAPACITY,
};
use serde_json::Value;
use sqlite_store::SqlitePromotionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Initialize logging for tests
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}

/// Write straight to the in-process configuration store.
pub fn direct_writer(config: Arc<InMemoryConfigStore>) -> Arc<dyn ConfigWriter> {
    config
}

/// A fully wired promotion engine backed by a temporary SQLite database.
///
/// Must be created inside a Tokio runtime: the execution queue worker is
/// spawned on construction.
pub struct TestEnvironment {
    pub service: Arc<PromotionService>,
    pub store: Arc<SqlitePromotionStore>,
    pub config: Arc<InMemoryConfigStore>,
    pub registry: Registry,
    router: Router,
    db_dir: TempDir,
}

impl TestEnvironment {
    /// Environment whose smoke tests always pass.
    pub fn new() -> anyhow::Result<Self> {
        Self::build(Arc::new(AlwaysPassSmokeTestRunner::new()), direct_writer)
    }

    /// Environment with a custom smoke-test runner.
    pub fn with_smoke_tests(smoke_tests: Arc<dyn SmokeTestRunner>) -> anyhow::Result<Self> {
        Self::build(smoke_tests, direct_writer)
    }

    /// Environment whose writer is derived from the configuration store, e.g.
    /// to inject write failures.
    pub fn build(
        smoke_tests: Arc<dyn SmokeTestRunner>,
        writer: impl FnOnce(Arc<InMemoryConfigStore>) -> Arc<dyn ConfigWriter>,
    ) -> anyhow::Result<Self> {
        let db_dir = TempDir::new()?;
        let store = Arc::new(SqlitePromotionStore::open(
            db_dir.path().join("promotions.db"),
        )?);
        let config = Arc::new(InMemoryConfigStore::new());
        let registry = Registry::new();
        let metrics = PrometheusPromotionMetrics::new(&registry)?;

        let service = Arc::new(
            PromotionService::new(
                store.clone(),
                config.clone(),
                writer(config.clone()),
                smoke_tests,
            )
            .with_metrics(Arc::new(metrics)),
        );
        let (queue, _worker) = ExecutionQueue::start(service.clone(), DEFAULT_QUEUE_CAPACITY);
        let router = create_router(AppState::new(service.clone(), queue, registry.clone()));

        Ok(Self {
            service,
            store,
            config,
            registry,
            router,
            db_dir,
        })
    }

    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.db_dir.path().join("promotions.db")
    }

    /// Set every `(key, value)` pair in `environment` with type `STRING`.
    pub async fn seed(&self, environment: &str, entries: &[(&str, &str)]) {
        for (key, value) in entries {
            self.config.put(environment, key, value, "STRING").await;
        }
    }

    /// Send a request through the router and decode the JSON body
    /// (`Value::Null` for an empty or non-JSON body).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok((status, json))
    }

    /// Render the metrics registry in the text exposition format.
    pub fn metrics_text(&self) -> anyhow::Result<String> {
        use prometheus::Encoder;

        let mut buffer = Vec::new();
        prometheus::TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
