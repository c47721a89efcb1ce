//! Translation between HTTP types and domain types
//!
//! Conversions from HTTP request models to the inputs of
//! `promotion_core::PromotionService`. Domain to HTTP conversions live next to
//! the response models as `From` implementations.

use promotion_core::{NewPromotionRequest, PromotionFilter, PromotionId, PromotionStatus};

use crate::{
    errors::ApiError,
    models::request::{CreatePromotionRequest, ListPromotionsQuery},
};

#[cfg(test)]
#[path = "translation_tests.rs"]
mod tests;

/// Convert HTTP CreatePromotionRequest to the domain draft.
///
/// Field validation (lengths, blank values, distinct environments) happens in
/// the domain when the draft is turned into a `PromotionRequest`.
pub fn http_create_request_to_domain(http_req: CreatePromotionRequest) -> NewPromotionRequest {
    NewPromotionRequest {
        application_id: http_req.application_id,
        source_environment: http_req.source_environment,
        target_environment: http_req.target_environment,
        requested_by: http_req.requested_by,
        include_all_configs: http_req.include_all_configs,
        config_keys: http_req.config_keys,
        smoke_test_enabled: http_req.smoke_test_enabled,
    }
}

/// Convert list query parameters to a store filter.
///
/// Blank parameters are ignored.
///
/// # Errors
///
/// Returns `ApiError::Validation` when `status` is not a known status name.
pub fn http_list_query_to_filter(query: ListPromotionsQuery) -> Result<PromotionFilter, ApiError> {
    let status = match non_blank(query.status) {
        Some(status) => Some(status.parse::<PromotionStatus>().map_err(|_| {
            ApiError::validation_error("status", format!("Unknown promotion status '{}'", status))
        })?),
        None => None,
    };

    Ok(PromotionFilter {
        application_id: non_blank(query.application_id),
        status,
        source_environment: non_blank(query.source_environment),
        target_environment: non_blank(query.target_environment),
    })
}

/// Parse a promotion id from a path segment.
///
/// A value that is not a valid id cannot name a stored request, so it is
/// reported as not found.
pub fn parse_promotion_id(raw: &str) -> Result<PromotionId, ApiError> {
    PromotionId::parse(raw).map_err(|_| ApiError::not_found(raw))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
