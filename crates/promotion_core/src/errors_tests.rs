//! Tests for promotion error types.

use super::*;
use crate::status::PromotionEvent;

#[test]
fn validation_error_reports_field() {
    assert_eq!(ValidationError::empty_field("requested_by").field(), "requested_by");
    assert_eq!(
        ValidationError::too_long("source_environment", 120, 100).field(),
        "source_environment"
    );
    assert_eq!(
        ValidationError::invalid_format("config_keys", "blank key").field(),
        "config_keys"
    );
}

#[test]
fn validation_error_messages() {
    let error = ValidationError::too_long("approved_by", 300, 255);
    assert_eq!(
        error.to_string(),
        "Field 'approved_by' is too long: 300 characters (maximum 255)"
    );

    let error = ValidationError::empty_field("reason");
    assert_eq!(error.to_string(), "Field 'reason' cannot be empty");
}

#[test]
fn invalid_transition_maps_to_invalid_state() {
    let error: PromotionError = InvalidTransition {
        from: PromotionStatus::Rejected,
        event: PromotionEvent::Approve,
    }
    .into();

    match error {
        PromotionError::InvalidState { status, operation } => {
            assert_eq!(status, PromotionStatus::Rejected);
            assert_eq!(operation, "approve");
        }
        other => panic!("Expected InvalidState, got {other:?}"),
    }
}

#[test]
fn store_version_conflict_maps_to_concurrent_modification() {
    let id = PromotionId::new();
    let error: PromotionError = StoreError::VersionConflict {
        id: id.clone(),
        expected: 2,
        actual: 3,
    }
    .into();

    assert_eq!(
        error,
        PromotionError::ConcurrentModification {
            id,
            expected: 2,
            actual: 3
        }
    );
}

#[test]
fn store_not_found_maps_to_not_found() {
    let id = PromotionId::new();
    let error: PromotionError = StoreError::NotFound { id: id.clone() }.into();

    assert_eq!(error, PromotionError::NotFound { id: id.to_string() });
}

#[test]
fn frozen_diffs_map_to_invalid_state() {
    let error: PromotionError = StoreError::DiffsFrozen {
        id: PromotionId::new(),
        status: PromotionStatus::Approved,
    }
    .into();

    assert!(matches!(
        error,
        PromotionError::InvalidState {
            status: PromotionStatus::Approved,
            ..
        }
    ));
}

#[test]
fn backend_failure_maps_to_store_error() {
    let error: PromotionError = StoreError::Backend {
        message: "disk full".to_string(),
    }
    .into();

    match error {
        PromotionError::Store { message } => assert!(message.contains("disk full")),
        other => panic!("Expected Store, got {other:?}"),
    }
}
