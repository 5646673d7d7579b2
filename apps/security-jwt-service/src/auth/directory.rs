// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User directory consulted for credentials and current authorities.

use async_trait::async_trait;

use crate::error::DependencyError;
use crate::models::UserGrant;

/// External source of truth for users.
///
/// Implementations must not distinguish between an unknown user, a wrong
/// password and an inactive user: all three are `Ok(None)`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserGrant>, DependencyError>;

    /// Authorities as of now, used when re-issuing tokens on refresh.
    async fn current_authorities(&self, username: &str)
        -> Result<Option<UserGrant>, DependencyError>;
}
