// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-value caches backing the client configuration store and the blacklist.
//!
//! Operations report failure as `false`/`None` instead of erroring; callers
//! decide what a failed write means for them.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::error::DependencyError;

const IN_PROCESS_CACHE: &str = "in-process cache";

/// Generic string-keyed cache.
///
/// Implementations own their locking and must be safe to share between
/// concurrent requests.
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    /// Like [`Cache::get`], but tells a miss apart from a failed read.
    fn try_get(&self, key: &str) -> Result<Option<V>, DependencyError> {
        Ok(self.get(key))
    }

    /// Returns whether the write succeeded.
    fn put(&self, key: &str, value: V) -> bool;

    /// Returns whether the write succeeded (also when the key was absent).
    fn remove(&self, key: &str) -> bool;

    fn contains(&self, key: &str) -> bool;

    fn clear(&self) -> bool;
}

/// Cached value + insertion timestamp.
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// In-process LRU cache with an optional per-entry time-to-live.
pub struct LruTtlCache<V> {
    cache: Mutex<LruCache<String, CacheEntry<V>>>,
    ttl: Option<Duration>,
}

impl<V> LruTtlCache<V> {
    /// Create a bounded cache.
    ///
    /// - `capacity`: Max number of entries; the least recently used is evicted.
    /// - `ttl`: Time-to-live for each entry, `None` to keep entries until evicted.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Create a cache that never evicts and never expires entries.
    pub fn unbounded() -> Self {
        Self {
            cache: Mutex::new(LruCache::unbounded()),
            ttl: None,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        self.ttl
            .is_none_or(|ttl| entry.inserted_at.elapsed() < ttl)
    }
}

impl<V: Clone + Send> Cache<V> for LruTtlCache<V> {
    /// Returns `None` if not cached, expired or unreadable.
    fn get(&self, key: &str) -> Option<V> {
        self.try_get(key).ok().flatten()
    }

    fn try_get(&self, key: &str) -> Result<Option<V>, DependencyError> {
        let mut cache = self.cache.lock().map_err(|_| {
            DependencyError::Unavailable(IN_PROCESS_CACHE, "lock poisoned".to_string())
        })?;
        if let Some(entry) = cache.get(key) {
            if self.is_fresh(entry) {
                return Ok(Some(entry.value.clone()));
            }
            // Expired, drop it
            cache.pop(key);
        }
        Ok(None)
    }

    fn put(&self, key: &str, value: V) -> bool {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.put(
                    key.to_string(),
                    CacheEntry {
                        value,
                        inserted_at: Instant::now(),
                    },
                );
                true
            }
            Err(_) => false,
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.pop(key);
                true
            }
            Err(_) => false,
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn clear(&self) -> bool {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.clear();
                true
            }
            Err(_) => false,
        }
    }
}
