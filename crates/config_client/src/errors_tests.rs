//! Tests for configuration client errors.

use super::*;

#[test]
fn status_maps_to_rejected() {
    let err: CollaboratorError = ConfigClientError::Status {
        status: 409,
        body: "duplicate key".to_string(),
    }
    .into();

    assert_eq!(
        err,
        CollaboratorError::Rejected {
            status: 409,
            message: "duplicate key".to_string()
        }
    );
}

#[test]
fn deserialization_maps_to_invalid_response() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: CollaboratorError = ConfigClientError::Deserialization(json_err).into();

    assert!(matches!(err, CollaboratorError::InvalidResponse { .. }));
}

#[test]
fn invalid_base_url_maps_to_invalid_response() {
    let err: CollaboratorError = ConfigClientError::InvalidBaseUrl {
        url: "mailto:x".to_string(),
        reason: "cannot be a base".to_string(),
    }
    .into();

    match err {
        CollaboratorError::InvalidResponse { message } => assert!(message.contains("mailto:x")),
        other => panic!("Expected InvalidResponse, got {other:?}"),
    }
}
