//! HTTP request and response models
//!
//! These types are distinct from domain types and exist only in the HTTP layer.
//! All of them use camelCase field names on the wire.

pub mod request;
pub mod response;

pub use request::{
    ApprovePromotionRequest, CreatePromotionRequest, ListPromotionsQuery, PreviewDiffsRequest,
    RecentPromotionsQuery, RejectPromotionRequest, RollbackQuery,
};
pub use response::{
    DiffResponse, DiffSummaryResponse, ExecutionQueuedResponse, HealthResponse,
    PreviewDiffsResponse, PromotionResponse, PromotionStatisticsResponse,
};
