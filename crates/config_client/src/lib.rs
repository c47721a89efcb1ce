//! Crate for talking to the configuration service.
//!
//! The promotion engine reads environment snapshots and writes single keys
//! through the traits of `promotion_core`. This crate provides two adapters:
//! - [`HttpConfigClient`] for the configuration service REST API
//! - [`InMemoryConfigStore`] for tests and for running without a service

use async_trait::async_trait;
use promotion_core::{
    ApplicationId, CollaboratorError, ConfigRecord, ConfigSnapshotProvider, ConfigWriter,
    EnvironmentName, Snapshot,
};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

pub mod errors;
pub use errors::ConfigClientError;

pub mod in_memory;
pub use in_memory::InMemoryConfigStore;

pub mod models;
pub use models::{ConfigurationResponse, CreateConfigurationRequest, UpdateConfigurationRequest};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Type used for keys created with type `SECRET`.
const SECRET_TYPE: &str = "SECRET";

/// How snapshots are read from the configuration service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotMode {
    /// `GET /configurations/environment/{env}`: values with type and version.
    #[default]
    Typed,
    /// `GET /configurations/environment/{env}/map`: values only; every entry is
    /// reported as type `STRING`, version 1.
    ValuesOnly,
}

/// A client for the configuration service REST API.
///
/// The service keys configuration by environment identifier only, so the
/// application identifier passed by the promotion engine is not part of any
/// request.
#[derive(Debug, Clone)]
pub struct HttpConfigClient {
    client: reqwest::Client,
    base_url: Url,
    mode: SnapshotMode,
}

impl HttpConfigClient {
    /// Create a client for the service rooted at `base_url`, e.g.
    /// `http://config:8081/api/v1`.
    ///
    /// # Errors
    /// Returns `ConfigClientError::InvalidBaseUrl` when the URL cannot be parsed
    /// or cannot have path segments appended.
    pub fn new(base_url: &str) -> Result<Self, ConfigClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ConfigClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ConfigClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConfigClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url: parsed,
            mode: SnapshotMode::default(),
        })
    }

    pub fn with_snapshot_mode(mut self, mode: SnapshotMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn snapshot_mode(&self) -> SnapshotMode {
        self.mode
    }

    /// Append percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, ConfigClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfigClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ConfigClientError> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ConfigClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ConfigClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// List every configuration entry of `environment`.
    #[instrument(skip(self))]
    pub async fn list_environment(
        &self,
        environment: &str,
    ) -> Result<Vec<ConfigurationResponse>, ConfigClientError> {
        let url = self.url(&["configurations", "environment", environment])?;
        let response = self.client.get(url).send().await?;
        Self::read_json(response).await
    }

    /// Read the key/value map of `environment`.
    #[instrument(skip(self))]
    pub async fn configuration_map(
        &self,
        environment: &str,
    ) -> Result<BTreeMap<String, String>, ConfigClientError> {
        let url = self.url(&["configurations", "environment", environment, "map"])?;
        let response = self.client.get(url).send().await?;
        Self::read_json(response).await
    }

    /// Look up one key; `Ok(None)` when the service answers 404.
    #[instrument(skip(self))]
    pub async fn find_by_key(
        &self,
        environment: &str,
        key: &str,
    ) -> Result<Option<ConfigurationResponse>, ConfigClientError> {
        let url = self.url(&["configurations", "environment", environment, "key", key])?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::read_json(response).await.map(Some)
    }

    pub async fn create(
        &self,
        request: &CreateConfigurationRequest,
    ) -> Result<ConfigurationResponse, ConfigClientError> {
        let url = self.url(&["configurations"])?;
        let response = self.client.post(url).json(request).send().await?;
        Self::read_json(response).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateConfigurationRequest,
    ) -> Result<ConfigurationResponse, ConfigClientError> {
        let url = self.url(&["configurations", id])?;
        let response = self.client.put(url).json(request).send().await?;
        Self::read_json(response).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ConfigClientError> {
        let url = self.url(&["configurations", id])?;
        let response = self.client.delete(url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigSnapshotProvider for HttpConfigClient {
    async fn snapshot(
        &self,
        _application: &ApplicationId,
        environment: &EnvironmentName,
    ) -> Result<Snapshot, CollaboratorError> {
        let snapshot: Snapshot = match self.mode {
            SnapshotMode::Typed => self
                .list_environment(environment.as_str())
                .await?
                .into_iter()
                .map(|entry| (entry.key.clone(), entry.to_record()))
                .collect(),
            SnapshotMode::ValuesOnly => self
                .configuration_map(environment.as_str())
                .await?
                .into_iter()
                .map(|(key, value)| (key, ConfigRecord::untyped(value)))
                .collect(),
        };

        debug!(
            environment = %environment,
            entries = snapshot.len(),
            mode = ?self.mode,
            "Fetched configuration snapshot"
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl ConfigWriter for HttpConfigClient {
    async fn apply_configuration_change(
        &self,
        environment: &EnvironmentName,
        key: &str,
        value: &str,
        config_type: &str,
    ) -> Result<(), CollaboratorError> {
        match self.find_by_key(environment.as_str(), key).await? {
            Some(existing) => {
                let request = UpdateConfigurationRequest {
                    value: value.to_string(),
                    config_type: config_type.to_string(),
                    description: existing.description.clone(),
                    is_secret: existing.is_secret() || config_type == SECRET_TYPE,
                };
                self.update(&existing.id, &request).await?;
                info!(environment = %environment, key = key, id = %existing.id, "Updated configuration key");
            }
            None => {
                let request = CreateConfigurationRequest {
                    key: key.to_string(),
                    value: value.to_string(),
                    config_type: config_type.to_string(),
                    description: None,
                    is_secret: config_type == SECRET_TYPE,
                    environment_id: environment.to_string(),
                };
                let created = self.create(&request).await?;
                info!(environment = %environment, key = key, id = %created.id, "Created configuration key");
            }
        }
        Ok(())
    }

    async fn delete_configuration_key(
        &self,
        environment: &EnvironmentName,
        key: &str,
    ) -> Result<(), CollaboratorError> {
        match self.find_by_key(environment.as_str(), key).await? {
            Some(existing) => {
                self.delete(&existing.id).await?;
                info!(environment = %environment, key = key, id = %existing.id, "Deleted configuration key");
            }
            None => {
                debug!(environment = %environment, key = key, "Configuration key already absent");
            }
        }
        Ok(())
    }
}
