//! Interfaces to the configuration service.
//!
//! The promotion engine never stores configuration itself. It reads snapshots
//! through [`ConfigSnapshotProvider`] and writes single keys through
//! [`ConfigWriter`]; adapters live in the `config_client` crate.

use async_trait::async_trait;

use crate::diff::{KeyChange, Snapshot};
use crate::errors::CollaboratorError;
use crate::types::{ApplicationId, EnvironmentName};

/// Read access to the configuration of one environment.
#[async_trait]
pub trait ConfigSnapshotProvider: Send + Sync {
    /// Fetch every configuration entry visible for `application` in
    /// `environment`.
    async fn snapshot(
        &self,
        application: &ApplicationId,
        environment: &EnvironmentName,
    ) -> Result<Snapshot, CollaboratorError>;
}

/// Write access to single configuration keys.
#[async_trait]
pub trait ConfigWriter: Send + Sync {
    /// Create or update `key` in `environment`.
    async fn apply_configuration_change(
        &self,
        environment: &EnvironmentName,
        key: &str,
        value: &str,
        config_type: &str,
    ) -> Result<(), CollaboratorError>;

    /// Remove `key` from `environment`. Removing a missing key succeeds.
    async fn delete_configuration_key(
        &self,
        environment: &EnvironmentName,
        key: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Send one [`KeyChange`] to `writer`.
pub async fn apply_key_change(
    writer: &dyn ConfigWriter,
    environment: &EnvironmentName,
    change: &KeyChange,
) -> Result<(), CollaboratorError> {
    match change {
        KeyChange::Upsert {
            key,
            value,
            config_type,
        } => {
            writer
                .apply_configuration_change(environment, key, value, config_type)
                .await
        }
        KeyChange::Delete { key } => writer.delete_configuration_key(environment, key).await,
    }
}
