//! In-process configuration store.

use async_trait::async_trait;
use promotion_core::{
    ApplicationId, CollaboratorError, ConfigRecord, ConfigSnapshotProvider, ConfigWriter,
    EnvironmentName, Snapshot,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[cfg(test)]
#[path = "in_memory_tests.rs"]
mod tests;

/// Configuration of every environment kept in memory.
///
/// Upserting a key bumps its version; deleting a missing key succeeds.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    environments: RwLock<HashMap<String, Snapshot>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `environments`.
    pub fn with_environments(environments: HashMap<String, Snapshot>) -> Self {
        Self {
            environments: RwLock::new(environments),
        }
    }

    /// Set `key` in `environment`, bumping its version.
    pub async fn put(&self, environment: &str, key: &str, value: &str, config_type: &str) {
        let mut environments = self.environments.write().await;
        let snapshot = environments.entry(environment.to_string()).or_default();
        let version = snapshot.get(key).map_or(1, |record| record.version + 1);
        snapshot.insert(
            key.to_string(),
            ConfigRecord::new(value, config_type, version),
        );
    }

    pub async fn remove(&self, environment: &str, key: &str) -> bool {
        let mut environments = self.environments.write().await;
        environments
            .get_mut(environment)
            .and_then(|snapshot| snapshot.remove(key))
            .is_some()
    }

    /// Current snapshot of `environment`; empty when unknown.
    pub async fn snapshot_of(&self, environment: &str) -> Snapshot {
        self.environments
            .read()
            .await
            .get(environment)
            .cloned()
            .unwrap_or_default()
    }

    /// Key/value view of `environment`.
    pub async fn values(&self, environment: &str) -> BTreeMap<String, String> {
        self.snapshot_of(environment)
            .await
            .into_iter()
            .map(|(key, record)| (key, record.value))
            .collect()
    }
}

#[async_trait]
impl ConfigSnapshotProvider for InMemoryConfigStore {
    async fn snapshot(
        &self,
        _application: &ApplicationId,
        environment: &EnvironmentName,
    ) -> Result<Snapshot, CollaboratorError> {
        Ok(self.snapshot_of(environment.as_str()).await)
    }
}

#[async_trait]
impl ConfigWriter for InMemoryConfigStore {
    async fn apply_configuration_change(
        &self,
        environment: &EnvironmentName,
        key: &str,
        value: &str,
        config_type: &str,
    ) -> Result<(), CollaboratorError> {
        self.put(environment.as_str(), key, value, config_type).await;
        debug!(environment = %environment, key = key, "Stored configuration key");
        Ok(())
    }

    async fn delete_configuration_key(
        &self,
        environment: &EnvironmentName,
        key: &str,
    ) -> Result<(), CollaboratorError> {
        let removed = self.remove(environment.as_str(), key).await;
        debug!(environment = %environment, key = key, removed = removed, "Removed configuration key");
        Ok(())
    }
}
