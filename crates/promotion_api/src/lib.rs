//! Promotion Engine REST API
//!
//! HTTP surface of the environment promotion engine. Exposes endpoints for
//! creating, reviewing, executing and rolling back configuration promotions.
//!
//! # Architecture
//!
//! This crate exists in the HTTP layer and handles:
//! - HTTP request/response translation
//! - Error mapping from domain to HTTP
//! - Routing, tracing and server configuration
//! - Service configuration and wiring of the concrete collaborators
//!
//! The dependency flows HTTP API → `promotion_core`, never the reverse.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod translation;

use prometheus::Registry;
use promotion_core::{ExecutionQueue, PromotionService};
use std::sync::Arc;

// Re-export key types for convenience
pub use config::{ConfigError, LogFormat, ServiceConfig, StoreBackend};
pub use errors::{ApiError, ErrorResponse};
pub use models::{request, response};
pub use routes::create_router;
pub use server::{ApiConfig, ApiServer};

/// API version
pub const API_VERSION: &str = "v1";

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Orchestrates every promotion operation
    pub service: Arc<PromotionService>,

    /// Background execution queue fed by `execute/async`
    pub queue: ExecutionQueue,

    /// Registry rendered by `GET /metrics`
    pub registry: Registry,
}

impl AppState {
    pub fn new(service: Arc<PromotionService>, queue: ExecutionQueue, registry: Registry) -> Self {
        Self {
            service,
            queue,
            registry,
        }
    }
}

#[cfg(test)]
mod test_support;
