// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! In-process caches and the stores built on top of them.
//!
//! ## Components
//!
//! - [`LruTtlCache`]: bounded LRU cache with an optional per-entry TTL
//! - [`ClientConfigurationStore`]: read-through cache of client signing
//!   configurations over a [`ClientConfigDurableStore`]
//! - [`UserBlacklist`]: usernames denied authentication
//!
//! Caches are injected as `Arc<dyn Cache<_>>`, so a distributed cache can
//! stand in for the in-process one without touching the callers.

pub mod blacklist;
pub mod cache;
pub mod client_store;

pub use blacklist::UserBlacklist;
pub use cache::{Cache, LruTtlCache};
pub use client_store::{
    ClientConfigDurableStore, ClientConfigurationStore, ClientLookupError, ClientsFileError,
    InMemoryClientConfigStore,
};
