//! Shared test doubles for the collaborator traits.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::collaborators::{ConfigSnapshotProvider, ConfigWriter};
use crate::diff::{ConfigRecord, Snapshot};
use crate::errors::CollaboratorError;
use crate::types::{ApplicationId, EnvironmentName};

// Configuration service double implementing both collaborator traits.
#[derive(Default)]
pub struct FakeConfigService {
    pub environments: Mutex<HashMap<String, Snapshot>>,
    pub failing_keys: Mutex<HashSet<String>>,
    pub unavailable: AtomicBool,
    pub writes: AtomicU64,
    pub write_delay: Mutex<Option<Duration>>,
}

impl FakeConfigService {
    pub fn with_environment(self, environment: &str, entries: &[(&str, &str)]) -> Self {
        let snapshot = entries
            .iter()
            .map(|(k, v)| (k.to_string(), ConfigRecord::untyped(*v)))
            .collect();
        self.environments
            .lock()
            .unwrap()
            .insert(environment.to_string(), snapshot);
        self
    }

    pub fn set(&self, environment: &str, key: &str, value: &str) {
        self.environments
            .lock()
            .unwrap()
            .entry(environment.to_string())
            .or_default()
            .insert(key.to_string(), ConfigRecord::untyped(value));
    }

    pub fn values(&self, environment: &str) -> BTreeMap<String, String> {
        self.environments
            .lock()
            .unwrap()
            .get(environment)
            .map(|snapshot| {
                snapshot
                    .iter()
                    .map(|(k, r)| (k.clone(), r.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make every write sleep for `delay` first.
    pub fn with_write_delay(self, delay: Duration) -> Self {
        *self.write_delay.lock().unwrap() = Some(delay);
        self
    }

    async fn pause_before_write(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn fail_writes_for(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn heal_writes(&self) {
        self.failing_keys.lock().unwrap().clear();
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self, key: &str) -> Result<(), CollaboratorError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(CollaboratorError::Rejected {
                status: 500,
                message: format!("write of {key} refused"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigSnapshotProvider for FakeConfigService {
    async fn snapshot(
        &self,
        _application: &ApplicationId,
        environment: &EnvironmentName,
    ) -> Result<Snapshot, CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable {
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .environments
            .lock()
            .unwrap()
            .get(environment.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ConfigWriter for FakeConfigService {
    async fn apply_configuration_change(
        &self,
        environment: &EnvironmentName,
        key: &str,
        value: &str,
        config_type: &str,
    ) -> Result<(), CollaboratorError> {
        self.pause_before_write().await;
        self.check_write(key)?;
        let mut environments = self.environments.lock().unwrap();
        let snapshot = environments.entry(environment.to_string()).or_default();
        let version = snapshot.get(key).map_or(1, |r| r.version + 1);
        snapshot.insert(key.to_string(), ConfigRecord::new(value, config_type, version));
        Ok(())
    }

    async fn delete_configuration_key(
        &self,
        environment: &EnvironmentName,
        key: &str,
    ) -> Result<(), CollaboratorError> {
        self.pause_before_write().await;
        self.check_write(key)?;
        if let Some(snapshot) = self.environments.lock().unwrap().get_mut(environment.as_str()) {
            snapshot.remove(key);
        }
        Ok(())
    }
}
