//! Tests for HTTP request models

use super::*;
use serde_json::json;

#[test]
fn test_create_request_deserializes_camel_case() {
    let request: CreatePromotionRequest = serde_json::from_value(json!({
        "applicationId": "billing",
        "sourceEnvironment": "staging",
        "targetEnvironment": "production",
        "requestedBy": "alice",
        "includeAllConfigs": false,
        "configKeys": ["A"],
        "smokeTestEnabled": true
    }))
    .unwrap();

    assert_eq!(request.application_id, "billing");
    assert!(!request.include_all_configs);
    assert_eq!(request.config_keys, vec!["A".to_string()]);
    assert!(request.smoke_test_enabled);
}

#[test]
fn test_create_request_requires_flags() {
    let result: Result<CreatePromotionRequest, _> = serde_json::from_value(json!({
        "applicationId": "billing",
        "sourceEnvironment": "staging",
        "targetEnvironment": "production",
        "requestedBy": "alice"
    }));

    assert!(result.is_err());
}

#[test]
fn test_approve_reason_is_optional() {
    let request: ApprovePromotionRequest =
        serde_json::from_value(json!({ "approvedBy": "bob" })).unwrap();

    assert_eq!(request.approved_by, "bob");
    assert!(request.reason.is_none());
}

#[test]
fn test_recent_limit_defaults_to_ten() {
    assert_eq!(RecentPromotionsQuery::default().limit(), 10);
    assert_eq!(RecentPromotionsQuery { limit: Some(3) }.limit(), 3);
}

#[test]
fn test_recent_limit_is_capped() {
    let query = RecentPromotionsQuery {
        limit: Some(usize::MAX),
    };
    assert_eq!(query.limit(), MAX_RECENT_LIMIT);
}

#[test]
fn test_rollback_reason_defaults() {
    assert_eq!(RollbackQuery::default().reason(), "Manual rollback");
    assert_eq!(
        RollbackQuery {
            reason: Some("  ".to_string())
        }
        .reason(),
        "Manual rollback"
    );
    assert_eq!(
        RollbackQuery {
            reason: Some("bad deploy".to_string())
        }
        .reason(),
        "bad deploy"
    );
}
