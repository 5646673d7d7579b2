// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client signing configuration lookup.
//!
//! [`ClientConfigurationStore`] is a read-through cache in front of a
//! [`ClientConfigDurableStore`]. A cached configuration is served until its
//! TTL runs out or it is invalidated; the durable store is not consulted on a
//! hit, so a rotated secret takes effect only after one of those.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::cache::Cache;
use crate::auth::cipher::SecretCipher;
use crate::error::{bounded, DependencyError};
use crate::models::ClientSigningConfig;

const DURABLE_STORE: &str = "client configuration store";

/// Durable source of client signing configurations.
#[async_trait]
pub trait ClientConfigDurableStore: Send + Sync {
    /// `Ok(None)` when no client is registered under `client_id`.
    async fn load(&self, client_id: &str) -> Result<Option<ClientSigningConfig>, DependencyError>;
}

/// Error type for client configuration lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientLookupError {
    #[error("no client registered with id `{0}`")]
    NotFound(String),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("client `{client_id}` has an unusable configuration: {reason}")]
    Configuration { client_id: String, reason: String },
}

/// Error type for reading a clients file.
#[derive(Debug, thiserror::Error)]
pub enum ClientsFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable store kept in process memory.
///
/// Suitable for tests and for deployments that ship client definitions as a
/// JSON file.
#[derive(Default)]
pub struct InMemoryClientConfigStore {
    clients: RwLock<HashMap<String, ClientSigningConfig>>,
}

impl InMemoryClientConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = ClientSigningConfig>) -> Self {
        let clients = clients
            .into_iter()
            .map(|config| (config.client_id.clone(), config))
            .collect();
        Self {
            clients: RwLock::new(clients),
        }
    }

    /// Load a JSON array of client definitions.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ClientsFileError> {
        let reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let clients: Vec<ClientSigningConfig> = serde_json::from_reader(reader)?;
        Ok(Self::with_clients(clients))
    }

    pub async fn insert(&self, config: ClientSigningConfig) {
        self.clients
            .write()
            .await
            .insert(config.client_id.clone(), config);
    }

    pub async fn remove(&self, client_id: &str) -> Option<ClientSigningConfig> {
        self.clients.write().await.remove(client_id)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}

#[async_trait]
impl ClientConfigDurableStore for InMemoryClientConfigStore {
    async fn load(&self, client_id: &str) -> Result<Option<ClientSigningConfig>, DependencyError> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }
}

/// Read-through cache of resolved client signing configurations.
///
/// Cached values always carry decrypted key material.
pub struct ClientConfigurationStore {
    durable: Arc<dyn ClientConfigDurableStore>,
    cache: Arc<dyn Cache<Arc<ClientSigningConfig>>>,
    cipher: SecretCipher,
    timeout: Duration,
}

impl ClientConfigurationStore {
    pub fn new(
        durable: Arc<dyn ClientConfigDurableStore>,
        cache: Arc<dyn Cache<Arc<ClientSigningConfig>>>,
        cipher: SecretCipher,
        timeout: Duration,
    ) -> Self {
        Self {
            durable,
            cache,
            cipher,
            timeout,
        }
    }

    /// Resolve the signing configuration of `client_id`.
    pub async fn get(&self, client_id: &str) -> Result<Arc<ClientSigningConfig>, ClientLookupError> {
        if client_id.is_empty() {
            return Err(ClientLookupError::NotFound(String::new()));
        }
        if let Some(config) = self.cache.get(client_id) {
            return Ok(config);
        }

        let loaded = bounded(DURABLE_STORE, self.timeout, self.durable.load(client_id))
            .await?
            .ok_or_else(|| ClientLookupError::NotFound(client_id.to_string()))?;
        if loaded.client_id != client_id {
            return Err(ClientLookupError::Configuration {
                client_id: client_id.to_string(),
                reason: format!("store returned client `{}`", loaded.client_id),
            });
        }

        let resolved = Arc::new(self.resolve(loaded)?);
        if !self.cache.put(client_id, Arc::clone(&resolved)) {
            tracing::warn!(client_id, "Client configuration cache rejected put");
        }
        tracing::debug!(
            client_id,
            algorithm = %resolved.signature_algorithm,
            "Loaded client signing configuration"
        );
        Ok(resolved)
    }

    /// Validate, resolve and cache a configuration directly.
    ///
    /// Returns whether the cache accepted the write.
    pub fn put(&self, config: ClientSigningConfig) -> Result<bool, ClientLookupError> {
        let client_id = config.client_id.clone();
        let resolved = self.resolve(config)?;
        Ok(self.cache.put(&client_id, Arc::new(resolved)))
    }

    /// Drop the cached entry. Idempotent.
    pub fn invalidate(&self, client_id: &str) -> bool {
        if client_id.is_empty() {
            return false;
        }
        self.cache.remove(client_id)
    }

    pub fn contains(&self, client_id: &str) -> bool {
        !client_id.is_empty() && self.cache.contains(client_id)
    }

    pub fn clear(&self) -> bool {
        self.cache.clear()
    }

    fn resolve(&self, config: ClientSigningConfig) -> Result<ClientSigningConfig, ClientLookupError> {
        let unusable = |reason: String| ClientLookupError::Configuration {
            client_id: config.client_id.clone(),
            reason,
        };

        config.validate().map_err(|e| unusable(e.to_string()))?;
        let key_material = self
            .cipher
            .decrypt(&config.signing_secret)
            .map_err(|e| unusable(e.to_string()))?;
        Ok(config.with_resolved_secret(key_material))
    }
}
