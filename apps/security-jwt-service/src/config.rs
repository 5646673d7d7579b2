// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by the token services. Configuration is loaded from the environment
//! once, when the application state is built.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CIPHER_MASTER_KEY` | Master key for `{cipher}` signing secrets | None (encrypted secrets are rejected) |
//! | `CLIENT_CACHE_CAPACITY` | Max number of cached client configurations | `1024` |
//! | `CLIENT_CACHE_TTL_SECS` | Time-to-live of a cached client configuration | `300` |
//! | `DEPENDENCY_TIMEOUT_MS` | Deadline for user directory and client store calls | `2000` |
//! | `CLIENTS_FILE` | JSON file of client definitions | None |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable name for the cipher master key.
///
/// The SHA-256 digest of this value is the AES-256-GCM key protecting
/// signing secrets stored with the `{cipher}` prefix. Never logged.
pub const CIPHER_MASTER_KEY_ENV: &str = "CIPHER_MASTER_KEY";

/// Environment variable name for the client configuration cache capacity.
pub const CLIENT_CACHE_CAPACITY_ENV: &str = "CLIENT_CACHE_CAPACITY";

/// Environment variable name for the client configuration cache TTL.
///
/// A rotated signing secret is picked up at the latest after this delay,
/// unless the client is invalidated explicitly.
pub const CLIENT_CACHE_TTL_SECS_ENV: &str = "CLIENT_CACHE_TTL_SECS";

/// Environment variable name for the collaborator call deadline.
pub const DEPENDENCY_TIMEOUT_MS_ENV: &str = "DEPENDENCY_TIMEOUT_MS";

/// Environment variable name for the JSON file of client definitions.
pub const CLIENTS_FILE_ENV: &str = "CLIENTS_FILE";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_CLIENT_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_CLIENT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_DEPENDENCY_TIMEOUT_MS: u64 = 2000;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Settings of the token services.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    pub cipher_master_key: Option<String>,
    pub client_cache_capacity: usize,
    /// `None` keeps client configurations until evicted or invalidated.
    pub client_cache_ttl: Option<Duration>,
    pub dependency_timeout: Duration,
    pub clients_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cipher_master_key: None,
            client_cache_capacity: DEFAULT_CLIENT_CACHE_CAPACITY,
            client_cache_ttl: Some(Duration::from_secs(DEFAULT_CLIENT_CACHE_TTL_SECS)),
            dependency_timeout: Duration::from_millis(DEFAULT_DEPENDENCY_TIMEOUT_MS),
            clients_file: None,
            log_format: LogFormat::default(),
        }
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field(
                "cipher_master_key",
                &self.cipher_master_key.as_ref().map(|_| "***"),
            )
            .field("client_cache_capacity", &self.client_cache_capacity)
            .field("client_cache_ttl", &self.client_cache_ttl)
            .field("dependency_timeout", &self.dependency_timeout)
            .field("clients_file", &self.clients_file)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl SecurityConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of a
    /// variable if set.
    ///
    /// Values that cannot be parsed fall back to their default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        // A TTL of zero disables expiry.
        let ttl_secs = parse_or(
            &non_empty,
            CLIENT_CACHE_TTL_SECS_ENV,
            DEFAULT_CLIENT_CACHE_TTL_SECS,
        );
        let client_cache_ttl = match ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            cipher_master_key: non_empty(CIPHER_MASTER_KEY_ENV),
            client_cache_capacity: parse_or(
                &non_empty,
                CLIENT_CACHE_CAPACITY_ENV,
                defaults.client_cache_capacity,
            ),
            client_cache_ttl,
            dependency_timeout: Duration::from_millis(parse_or(
                &non_empty,
                DEPENDENCY_TIMEOUT_MS_ENV,
                DEFAULT_DEPENDENCY_TIMEOUT_MS,
            )),
            clients_file: non_empty(CLIENTS_FILE_ENV).map(PathBuf::from),
            log_format: parse_or(&non_empty, LOG_FORMAT_ENV, defaults.log_format),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, ?default, "Ignoring invalid value");
            default
        }),
    }
}
