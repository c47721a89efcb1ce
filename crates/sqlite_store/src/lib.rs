//! SQLite persistence for promotion requests.
//!
//! [`SqlitePromotionStore`] implements `promotion_core::PromotionStore` on a
//! single SQLite connection. Requests live in `promotion_request` (queryable
//! columns plus the full request as JSON), their diffs in `promotion_diff`.
//!
//! Writes are guarded by the `version` column:
//!
//! ```sql
//! UPDATE promotion_request SET ..., version = version + 1
//!  WHERE id = ? AND version = ?
//! ```
//!
//! Zero affected rows means the request is either missing or was modified by
//! another writer, which is reported as `StoreError::VersionConflict`.

pub mod errors;
pub use errors::SqliteStoreError;

pub mod schema;

pub mod store;
pub use store::SqlitePromotionStore;
