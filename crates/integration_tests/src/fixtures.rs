//! Test fixtures for integration tests.

use promotion_core::NewPromotionRequest;
use std::collections::BTreeMap;

pub const APPLICATION: &str = "billing";
pub const SOURCE: &str = "staging";
pub const TARGET: &str = "production";

/// Draft promoting every key from staging to production.
pub fn promote_all() -> NewPromotionRequest {
    NewPromotionRequest {
        application_id: APPLICATION.to_string(),
        source_environment: SOURCE.to_string(),
        target_environment: TARGET.to_string(),
        requested_by: "alice".to_string(),
        include_all_configs: true,
        config_keys: Vec::new(),
        smoke_test_enabled: false,
    }
}

/// Draft promoting only `keys` from staging to production.
pub fn promote_keys(keys: &[&str]) -> NewPromotionRequest {
    NewPromotionRequest {
        include_all_configs: false,
        config_keys: keys.iter().map(|k| k.to_string()).collect(),
        ..promote_all()
    }
}

/// JSON body of `POST /api/v1/promotions` promoting every key.
pub fn create_body(smoke_test_enabled: bool) -> serde_json::Value {
    serde_json::json!({
        "applicationId": APPLICATION,
        "sourceEnvironment": SOURCE,
        "targetEnvironment": TARGET,
        "requestedBy": "alice",
        "includeAllConfigs": true,
        "configKeys": [],
        "smokeTestEnabled": smoke_test_enabled
    })
}

pub fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
