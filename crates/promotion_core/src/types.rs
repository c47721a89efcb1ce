//! Identifier types
//!
//! Branded identifiers used throughout the promotion domain. Constructors
//! validate their input so the rest of the crate can rely on well-formed values.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ValidationError;

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;

/// Maximum length of an environment name.
pub const MAX_ENVIRONMENT_LENGTH: usize = 100;

/// Maximum length of an application identifier or an actor name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of an approval, rejection or rollback reason.
pub const MAX_REASON_LENGTH: usize = 1000;

/// Unique identifier of a promotion request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromotionId(Uuid);

impl PromotionId {
    /// Generate a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an identifier from its hyphenated string form.
    ///
    /// # Errors
    /// Returns `ValidationError` if the value is not a UUID.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| ValidationError::invalid_format("promotion_id", "must be a UUID"))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PromotionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PromotionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PromotionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of the application whose configuration is promoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Create a new application identifier with validation
    ///
    /// # Validation Rules
    /// - Must not be blank
    /// - Length: at most 255 characters
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        require_text("application_id", value, MAX_NAME_LENGTH).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ApplicationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name (or identifier) of a deployment environment, e.g. `staging`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Create a new environment name with validation
    ///
    /// # Validation Rules
    /// - Must not be blank
    /// - Length: at most 100 characters
    /// - Must not contain `/` (the name is used as a URL path segment)
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        Self::for_field("environment", value)
    }

    /// Same as [`EnvironmentName::new`] but reports failures against `field`.
    pub fn for_field(field: &str, value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = require_text(field, value, MAX_ENVIRONMENT_LENGTH)?;
        if value.contains('/') {
            return Err(ValidationError::invalid_format(field, "must not contain '/'"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EnvironmentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a required free-text field.
///
/// The value is trimmed; blank values and values longer than `max` characters
/// are rejected.
pub fn require_text(
    field: &str,
    value: impl Into<String>,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }

    let length = trimmed.chars().count();
    if length > max {
        return Err(ValidationError::too_long(field, length, max));
    }

    Ok(trimmed.to_string())
}

/// Validate an optional free-text field; blank values become `None`.
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => require_text(field, text, max).map(Some),
    }
}
