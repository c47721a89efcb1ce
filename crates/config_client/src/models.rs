//! # Models
//!
//! Wire types of the configuration service REST API.

use promotion_core::ConfigRecord;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// One configuration entry as returned by the configuration service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationResponse {
    pub id: String,
    pub key: String,
    pub value: String,
    /// Configuration type, e.g. `STRING`, `INTEGER`, `JSON`, `SECRET`
    #[serde(rename = "type")]
    pub config_type: String,
    #[serde(default)]
    pub description: Option<String>,
    /// May be absent or `null` on the wire.
    #[serde(default)]
    pub is_secret: Option<bool>,
    pub environment_id: String,
    #[serde(default)]
    pub version_number: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ConfigurationResponse {
    pub fn is_secret(&self) -> bool {
        self.is_secret.unwrap_or(false)
    }

    /// Version of the entry; 1 when the service did not report one.
    pub fn version_number(&self) -> u32 {
        self.version_number.unwrap_or(1)
    }

    pub fn to_record(&self) -> ConfigRecord {
        ConfigRecord::new(
            self.value.clone(),
            self.config_type.clone(),
            self.version_number(),
        )
    }
}

/// Body of `POST /configurations`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfigurationRequest {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_secret: bool,
    pub environment_id: String,
}

/// Body of `PUT /configurations/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigurationRequest {
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_secret: bool,
}
