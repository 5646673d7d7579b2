// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::cipher::SecretCipher;
use crate::auth::directory::UserDirectory;
use crate::auth::service::AuthenticationService;
use crate::config::SecurityConfig;
use crate::storage::{
    ClientConfigDurableStore, ClientConfigurationStore, ClientsFileError,
    InMemoryClientConfigStore, LruTtlCache, UserBlacklist,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthenticationService>,
}

impl AppState {
    pub fn new(auth: AuthenticationService) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }

    /// Wire caches, cipher, client store and blacklist around the given
    /// collaborators.
    pub fn from_config(
        config: &SecurityConfig,
        directory: Arc<dyn UserDirectory>,
        durable: Arc<dyn ClientConfigDurableStore>,
    ) -> Self {
        let cipher = SecretCipher::from_master_key(config.cipher_master_key.as_deref());
        let clients = ClientConfigurationStore::new(
            durable,
            Arc::new(LruTtlCache::new(
                config.client_cache_capacity,
                config.client_cache_ttl,
            )),
            cipher,
            config.dependency_timeout,
        );

        tracing::info!(
            client_cache_capacity = config.client_cache_capacity,
            client_cache_ttl = ?config.client_cache_ttl,
            dependency_timeout = ?config.dependency_timeout,
            "Authentication service configured"
        );

        Self::new(AuthenticationService::new(
            Arc::new(clients),
            UserBlacklist::in_memory(),
            directory,
            config.dependency_timeout,
        ))
    }

    /// Like [`AppState::from_config`], with clients read from the configured
    /// clients file (none registered when unset).
    pub fn with_clients_file(
        config: &SecurityConfig,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, ClientsFileError> {
        let durable = match &config.clients_file {
            Some(path) => {
                let store = InMemoryClientConfigStore::from_json_file(path)?;
                tracing::info!(path = %path.display(), "Loaded client definitions");
                store
            }
            None => {
                tracing::warn!("No clients file configured; every client will be unknown");
                InMemoryClientConfigStore::new()
            }
        };
        Ok(Self::from_config(config, directory, Arc::new(durable)))
    }
}
