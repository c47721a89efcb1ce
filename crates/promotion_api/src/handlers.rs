//! HTTP request handlers
//!
//! Each handler:
//! 1. Extracts HTTP request data (path params, query params, body)
//! 2. Translates HTTP types to domain types
//! 3. Calls `PromotionService`
//! 4. Translates domain results to HTTP responses

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};

use crate::{
    errors::ApiError,
    models::{request::*, response::*},
    translation::{http_create_request_to_domain, http_list_query_to_filter, parse_promotion_id},
    AppState,
};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

/// POST /api/v1/promotions
///
/// Create a promotion request and compute its initial diffs. The diffs are
/// not echoed in the response.
pub async fn create_promotion(
    State(state): State<AppState>,
    Json(request): Json<CreatePromotionRequest>,
) -> Result<(StatusCode, Json<PromotionResponse>), ApiError> {
    let draft = http_create_request_to_domain(request);
    let created = state.service.create_promotion_request(draft).await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/v1/promotions/:id
///
/// Return a promotion request together with its stored diffs.
pub async fn get_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromotionResponse>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let (request, diffs) = state.service.get_promotion_with_diffs(&id).await?;

    Ok(Json(PromotionResponse::from(&request).with_diffs(&diffs)))
}

/// GET /api/v1/promotions
///
/// List promotion requests, newest first, optionally filtered by
/// `applicationId`, `status`, `sourceEnvironment` and `targetEnvironment`.
pub async fn list_promotions(
    State(state): State<AppState>,
    Query(query): Query<ListPromotionsQuery>,
) -> Result<Json<Vec<PromotionResponse>>, ApiError> {
    let filter = http_list_query_to_filter(query)?;
    let requests = state.service.list_promotions(&filter).await?;

    Ok(Json(requests.iter().map(PromotionResponse::from).collect()))
}

/// GET /api/v1/promotions/recent
pub async fn recent_promotions(
    State(state): State<AppState>,
    Query(query): Query<RecentPromotionsQuery>,
) -> Result<Json<Vec<PromotionResponse>>, ApiError> {
    let requests = state.service.recent_promotions(query.limit()).await?;

    Ok(Json(requests.iter().map(PromotionResponse::from).collect()))
}

/// POST /api/v1/promotions/:id/approve
pub async fn approve_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ApprovePromotionRequest>,
) -> Result<Json<PromotionResponse>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let approved = state
        .service
        .approve_promotion(&id, &request.approved_by, request.reason.as_deref())
        .await?;

    Ok(Json(approved.into()))
}

/// POST /api/v1/promotions/:id/reject
pub async fn reject_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RejectPromotionRequest>,
) -> Result<Json<PromotionResponse>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let rejected = state
        .service
        .reject_promotion(&id, &request.rejected_by, &request.reason)
        .await?;

    Ok(Json(rejected.into()))
}

/// POST /api/v1/promotions/:id/execute
///
/// Execute an approved promotion and wait for the outcome. A failed execution
/// is reported through the returned status (`FAILED` plus `errorMessage`), not
/// as an error response.
///
/// The execution runs on its own task, so it still finishes when the client
/// goes away before the response is written.
pub async fn execute_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromotionResponse>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let service = state.service.clone();
    let executed = tokio::spawn(async move { service.execute_promotion(&id).await }).await??;

    Ok(Json(executed.into()))
}

/// POST /api/v1/promotions/:id/execute/async
///
/// Check that the promotion can be executed, then hand it to the background
/// execution queue.
pub async fn execute_promotion_async(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ExecutionQueuedResponse>), ApiError> {
    let id = parse_promotion_id(&id)?;
    let request = state.service.ensure_executable(&id).await?;
    state.queue.enqueue(id.clone())?;

    tracing::info!(promotion_id = %id, "Promotion queued for execution");

    Ok((
        StatusCode::ACCEPTED,
        Json(ExecutionQueuedResponse {
            promotion_id: id.to_string(),
            status: request.status(),
            message: "Promotion queued for execution".to_string(),
        }),
    ))
}

/// POST /api/v1/promotions/:id/rollback?reason=
pub async fn rollback_promotion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RollbackQuery>,
) -> Result<Json<PromotionResponse>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let rolled_back = state
        .service
        .rollback_promotion(&id, query.reason())
        .await?;

    Ok(Json(rolled_back.into()))
}

/// GET /api/v1/promotions/:id/diffs
pub async fn get_diffs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DiffResponse>>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let diffs = state.service.get_diffs(&id).await?;

    Ok(Json(diffs.iter().map(DiffResponse::from).collect()))
}

/// POST /api/v1/promotions/:id/diffs/recalculate
///
/// Only allowed while the request is pending approval.
pub async fn recalculate_diffs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DiffResponse>>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let diffs = state.service.calculate_diffs(&id).await?;

    Ok(Json(diffs.iter().map(DiffResponse::from).collect()))
}

/// GET /api/v1/promotions/:id/diff/summary
pub async fn diff_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DiffSummaryResponse>, ApiError> {
    let id = parse_promotion_id(&id)?;
    let summary = state.service.diff_summary(&id).await?;

    Ok(Json(summary.into()))
}

/// POST /api/v1/promotions/preview
///
/// Compare two environments without creating a request.
pub async fn preview_diffs(
    State(state): State<AppState>,
    Json(request): Json<PreviewDiffsRequest>,
) -> Result<Json<PreviewDiffsResponse>, ApiError> {
    let diffs = state
        .service
        .preview_diffs(
            &request.application_id,
            &request.source_environment,
            &request.target_environment,
            &request.config_keys,
        )
        .await?;

    Ok(Json(PreviewDiffsResponse::from(diffs.as_slice())))
}

/// GET /api/v1/promotions/stats
pub async fn promotion_statistics(
    State(state): State<AppState>,
) -> Result<Json<PromotionStatisticsResponse>, ApiError> {
    let stats = state.service.statistics().await?;

    Ok(Json(stats.into()))
}

/// GET /api/v1/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /metrics
///
/// Prometheus text exposition of the promotion metrics.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&state.registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
