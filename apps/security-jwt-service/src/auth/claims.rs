// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claim sets issued for client applications.
//!
//! Registered claims are keyed by [`ClaimKey`] and type-checked when a token
//! payload is decoded. Every other key is kept verbatim as additional
//! information.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::models::AdditionalInfo;

/// Claim names this service reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClaimKey {
    Username,
    Authorities,
    /// Unique token id (`jti`)
    JwtId,
    /// Back-reference from a refresh token to its access token (`ati`)
    AccessJwtId,
    IssuedAt,
    ExpiresAt,
    Scope,
}

impl ClaimKey {
    pub const ALL: [ClaimKey; 7] = [
        ClaimKey::Username,
        ClaimKey::Authorities,
        ClaimKey::JwtId,
        ClaimKey::AccessJwtId,
        ClaimKey::IssuedAt,
        ClaimKey::ExpiresAt,
        ClaimKey::Scope,
    ];

    /// Name of the claim inside the token payload.
    pub fn name(&self) -> &'static str {
        match self {
            ClaimKey::Username => "username",
            ClaimKey::Authorities => "authorities",
            ClaimKey::JwtId => "jti",
            ClaimKey::AccessJwtId => "ati",
            ClaimKey::IssuedAt => "iat",
            ClaimKey::ExpiresAt => "exp",
            ClaimKey::Scope => "scope",
        }
    }

    pub fn from_name(name: &str) -> Option<ClaimKey> {
        ClaimKey::ALL.into_iter().find(|key| key.name() == name)
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ClaimKey::IssuedAt | ClaimKey::ExpiresAt => value.as_i64().is_some(),
            ClaimKey::Authorities => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ClaimKey::Username | ClaimKey::JwtId | ClaimKey::AccessJwtId | ClaimKey::Scope => {
                value.is_string()
            }
        }
    }
}

/// Claims every decoded token must carry.
const REQUIRED_CLAIMS: [ClaimKey; 4] = [
    ClaimKey::Username,
    ClaimKey::JwtId,
    ClaimKey::IssuedAt,
    ClaimKey::ExpiresAt,
];

/// Structural problems found while decoding a claim payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
    #[error("claim `{0}` is missing")]
    Missing(&'static str),

    #[error("claim `{0}` has an unexpected type")]
    WrongType(&'static str),
}

/// Claim set of one token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenClaims {
    registered: BTreeMap<ClaimKey, Value>,
    additional: AdditionalInfo,
}

impl TokenClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a registered claim. Values of the wrong type are rejected.
    pub fn set(&mut self, key: ClaimKey, value: impl Into<Value>) -> Result<(), ClaimsError> {
        let value = value.into();
        if !key.accepts(&value) {
            return Err(ClaimsError::WrongType(key.name()));
        }
        self.registered.insert(key, value);
        Ok(())
    }

    /// Merge free-form information. Keys naming a registered claim are skipped.
    pub fn merge_additional(&mut self, info: &AdditionalInfo) {
        for (key, value) in info {
            if ClaimKey::from_name(key).is_none() {
                self.additional.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn get(&self, key: ClaimKey) -> Option<&Value> {
        self.registered.get(&key)
    }

    pub fn username(&self) -> Option<&str> {
        self.get(ClaimKey::Username).and_then(Value::as_str)
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.get(ClaimKey::JwtId).and_then(Value::as_str)
    }

    pub fn access_jwt_id(&self) -> Option<&str> {
        self.get(ClaimKey::AccessJwtId).and_then(Value::as_str)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.get(ClaimKey::IssuedAt).and_then(Value::as_i64)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.get(ClaimKey::ExpiresAt).and_then(Value::as_i64)
    }

    pub fn authorities(&self) -> BTreeSet<String> {
        self.get(ClaimKey::Authorities)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn additional(&self) -> &AdditionalInfo {
        &self.additional
    }

    /// Refresh tokens are the ones pointing back at an access token.
    pub fn is_refresh_token(&self) -> bool {
        self.registered.contains_key(&ClaimKey::AccessJwtId)
    }

    /// Flatten into the JSON object signed as the token payload.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut payload = self.additional.clone();
        for (key, value) in &self.registered {
            payload.insert(key.name().to_string(), value.clone());
        }
        payload
    }

    /// Rebuild a claim set from a decoded payload, checking registered claim
    /// types and the presence of the required ones.
    pub fn from_json(payload: Map<String, Value>) -> Result<Self, ClaimsError> {
        let mut claims = TokenClaims::new();
        for (name, value) in payload {
            match ClaimKey::from_name(&name) {
                Some(key) => claims.set(key, value)?,
                None => {
                    claims.additional.insert(name, value);
                }
            }
        }
        for key in REQUIRED_CLAIMS {
            if !claims.registered.contains_key(&key) {
                return Err(ClaimsError::Missing(key.name()));
            }
        }
        Ok(claims)
    }
}

/// Claim sets produced by one issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTokenClaims {
    pub access_claims: TokenClaims,
    pub refresh_claims: TokenClaims,
    /// Merged into the access token only.
    pub additional_claims: AdditionalInfo,
}

impl RawTokenClaims {
    /// Payload of the access token: access claims plus additional claims.
    pub fn access_payload(&self) -> TokenClaims {
        let mut payload = self.access_claims.clone();
        payload.merge_additional(&self.additional_claims);
        payload
    }
}
