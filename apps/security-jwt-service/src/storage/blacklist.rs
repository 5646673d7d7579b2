// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Usernames currently denied authentication.

use std::sync::Arc;

use super::cache::{Cache, LruTtlCache};
use crate::error::DependencyError;

/// Cache-backed set of blocked usernames.
///
/// An empty username is never blocked and is never written.
#[derive(Clone)]
pub struct UserBlacklist {
    cache: Arc<dyn Cache<bool>>,
}

impl UserBlacklist {
    pub fn new(cache: Arc<dyn Cache<bool>>) -> Self {
        Self { cache }
    }

    /// Blacklist backed by an unbounded in-process cache.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(LruTtlCache::unbounded()))
    }

    /// `false` also when the cache cannot be read; gate authentication on
    /// [`UserBlacklist::is_blocked`] instead.
    pub fn contains(&self, username: &str) -> bool {
        !username.is_empty() && self.cache.contains(username)
    }

    /// Blacklist check that surfaces an unreadable cache as an error.
    pub fn is_blocked(&self, username: &str) -> Result<bool, DependencyError> {
        if username.is_empty() {
            return Ok(false);
        }
        Ok(self.cache.try_get(username)?.unwrap_or(false))
    }

    /// Returns whether the backing cache accepted the write.
    pub fn add(&self, username: &str) -> bool {
        if username.is_empty() {
            return false;
        }
        let stored = self.cache.put(username, true);
        if stored {
            tracing::info!(username, "User added to blacklist");
        } else {
            tracing::warn!(username, "Blacklist cache rejected add");
        }
        stored
    }

    /// Returns whether the backing cache accepted the write.
    pub fn remove(&self, username: &str) -> bool {
        if username.is_empty() {
            return false;
        }
        let removed = self.cache.remove(username);
        if removed {
            tracing::info!(username, "User removed from blacklist");
        } else {
            tracing::warn!(username, "Blacklist cache rejected remove");
        }
        removed
    }

    pub fn clear(&self) -> bool {
        self.cache.clear()
    }
}
