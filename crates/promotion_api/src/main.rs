//! Promotion Engine REST API Server
//!
//! Main binary for running the API server.
//!
//! # Environment Variables
//!
//! - `PROMOTION_CONFIG`: Path of the TOML configuration file (optional)
//! - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
//! - `PROMOTION_STORE`: `memory` or `sqlite` (default: memory)
//! - `PROMOTION_DB_PATH`: SQLite database file (default: promotions.db)
//! - `CONFIG_SERVICE_URL`: Configuration service base URL (default: in-process store)
//! - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
//! - `RUST_LOG`: Log filter (default: info)

use anyhow::Context;
use config_client::{HttpConfigClient, InMemoryConfigStore, SnapshotMode};
use prometheus::Registry;
use promotion_api::{
    ApiServer, AppState, LogFormat, ServiceConfig, StoreBackend, API_VERSION,
};
use promotion_core::{
    AlwaysPassSmokeTestRunner, ConfigSnapshotProvider, ConfigWriter, ExecutionQueue,
    HttpSmokeTestRunner, InMemoryPromotionStore, PrometheusPromotionMetrics, PromotionService,
    PromotionStore, SmokeTestRunner,
};
use sqlite_store::SqlitePromotionStore;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

fn build_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn PromotionStore>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryPromotionStore::new())),
        StoreBackend::Sqlite => {
            let store = SqlitePromotionStore::open(&config.store.sqlite_path).with_context(|| {
                format!(
                    "Failed to open promotion database {:?}",
                    config.store.sqlite_path
                )
            })?;
            Ok(Arc::new(store))
        }
    }
}

fn build_config_service(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn ConfigSnapshotProvider>, Arc<dyn ConfigWriter>)> {
    match &config.config_service.base_url {
        Some(base_url) => {
            let mode = if config.config_service.typed_snapshots {
                SnapshotMode::Typed
            } else {
                SnapshotMode::ValuesOnly
            };
            let client = Arc::new(
                HttpConfigClient::new(base_url)
                    .context("Invalid configuration service URL")?
                    .with_snapshot_mode(mode),
            );
            let snapshots: Arc<dyn ConfigSnapshotProvider> = client.clone();
            let writer: Arc<dyn ConfigWriter> = client;
            Ok((snapshots, writer))
        }
        None => {
            tracing::warn!("No configuration service configured, using an in-process store");
            let store = Arc::new(InMemoryConfigStore::new());
            let snapshots: Arc<dyn ConfigSnapshotProvider> = store.clone();
            let writer: Arc<dyn ConfigWriter> = store;
            Ok((snapshots, writer))
        }
    }
}

fn build_smoke_tests(config: &ServiceConfig) -> Arc<dyn SmokeTestRunner> {
    if config.smoke_tests.probes.is_empty() {
        Arc::new(AlwaysPassSmokeTestRunner::new())
    } else {
        Arc::new(HttpSmokeTestRunner::new(config.smoke_tests.probes.clone()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("Failed to load service configuration")?;
    init_tracing(config.log_format);

    let registry = Registry::new();
    let metrics = PrometheusPromotionMetrics::new(&registry)
        .context("Failed to register promotion metrics")?;

    let store = build_store(&config)?;
    let (snapshots, writer) = build_config_service(&config)?;
    let service = Arc::new(
        PromotionService::new(store, snapshots, writer, build_smoke_tests(&config))
            .with_metrics(Arc::new(metrics)),
    );

    let (queue, worker) = ExecutionQueue::start(service.clone(), config.execution.queue_capacity);
    let state = AppState::new(service, queue, registry);
    let server = ApiServer::new(config.server.clone(), state);

    tracing::info!(
        api_version = API_VERSION,
        store = ?config.store.backend,
        config_service = config.config_service.base_url.as_deref().unwrap_or("in-process"),
        "Starting promotion engine"
    );

    let served = server.serve().await;

    // The server owned every queue sender; the worker drains what is left and stops.
    tracing::info!("Waiting for queued promotions to finish");
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Execution worker stopped abnormally");
    }

    served
}
