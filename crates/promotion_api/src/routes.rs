//! HTTP routing configuration
//!
//! # Route Structure
//!
//! Promotion routes are prefixed with `/api/v1`:
//!
//! - POST   /api/v1/promotions - Create promotion request
//! - GET    /api/v1/promotions - List promotion requests
//! - GET    /api/v1/promotions/recent - Most recent promotion requests
//! - GET    /api/v1/promotions/stats - Counts per status
//! - POST   /api/v1/promotions/preview - Diff two environments without a request
//! - GET    /api/v1/promotions/:id - Promotion request with diffs
//! - POST   /api/v1/promotions/:id/approve - Approve
//! - POST   /api/v1/promotions/:id/reject - Reject
//! - POST   /api/v1/promotions/:id/execute - Execute and wait
//! - POST   /api/v1/promotions/:id/execute/async - Queue for execution
//! - POST   /api/v1/promotions/:id/rollback - Roll back a completed promotion
//! - GET    /api/v1/promotions/:id/diffs - Stored diffs
//! - POST   /api/v1/promotions/:id/diffs/recalculate - Recompute pending diffs
//! - GET    /api/v1/promotions/:id/diff/summary - Diff counts per change type
//! - GET    /api/v1/health - Health check
//! - GET    /metrics - Prometheus metrics

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{handlers, middleware as api_middleware, AppState};

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

/// Request timeout applied to every route except synchronous execution, which
/// is never cut short while changes are being applied
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the complete API router with all routes configured.
///
/// This function sets up:
/// - All endpoint routes
/// - CORS configuration
/// - Request tracing
/// - Timeout handling (all routes but `POST /promotions/:id/execute`)
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
        // Cache preflight responses for 1 hour
        .max_age(Duration::from_secs(3600));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_response(DefaultOnResponse::new().include_headers(true));

    let api_v1 = Router::new()
        .route("/health", get(handlers::health_check))
        .route_layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .nest("/promotions", promotion_routes());

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .route_layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .nest("/api/v1", api_v1)
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Promotion routes (nested under /promotions)
fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::create_promotion).get(handlers::list_promotions),
        )
        .route("/recent", get(handlers::recent_promotions))
        .route("/stats", get(handlers::promotion_statistics))
        .route("/preview", post(handlers::preview_diffs))
        .route("/:id", get(handlers::get_promotion))
        .route("/:id/approve", post(handlers::approve_promotion))
        .route("/:id/reject", post(handlers::reject_promotion))
        .route("/:id/execute/async", post(handlers::execute_promotion_async))
        .route("/:id/rollback", post(handlers::rollback_promotion))
        .route("/:id/diffs", get(handlers::get_diffs))
        .route("/:id/diffs/recalculate", post(handlers::recalculate_diffs))
        .route("/:id/diff/summary", get(handlers::diff_summary))
        .route_layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        // Added after the timeout so an execution is never interrupted.
        .route("/:id/execute", post(handlers::execute_promotion))
}
