// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::future::Future;
use std::time::Duration;

/// Failure of an external collaborator (user directory, durable store).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    #[error("{0} did not answer within {1:?}")]
    Timeout(&'static str, Duration),

    #[error("{0} is unavailable: {1}")]
    Unavailable(&'static str, String),
}

/// Run a collaborator call under a deadline. An elapsed deadline is reported,
/// never retried.
pub async fn bounded<T, F>(
    dependency: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, DependencyError>
where
    F: Future<Output = Result<T, DependencyError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DependencyError::Timeout(dependency, timeout)),
    }
}
