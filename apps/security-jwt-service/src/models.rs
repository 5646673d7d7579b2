// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain models shared by the token services and their callers.

use std::collections::BTreeSet;
use std::fmt;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::algorithm::{KeyFamily, SignatureAlgorithm};

/// Prefix marking a signing secret stored as ciphertext.
pub const CIPHER_SECRET_PREFIX: &str = "{cipher}";

/// Free-form claim values carried next to the registered claims.
pub type AdditionalInfo = Map<String, Value>;

/// Signing secret as stored, or as resolved by the secret cipher.
///
/// `Encrypted` holds the decoded envelope (`nonce || ciphertext || tag`) that
/// followed the `{cipher}` prefix in base64.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SigningSecret {
    Plaintext(Vec<u8>),
    Encrypted(Vec<u8>),
}

impl SigningSecret {
    /// Parse the at-rest string form.
    pub fn parse(raw: &str) -> Result<Self, ClientConfigError> {
        match raw.strip_prefix(CIPHER_SECRET_PREFIX) {
            Some(envelope) => Base64::decode_vec(envelope.trim())
                .map(SigningSecret::Encrypted)
                .map_err(|_| ClientConfigError::InvalidEncryptedSecret),
            None => Ok(SigningSecret::Plaintext(raw.as_bytes().to_vec())),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, SigningSecret::Encrypted(_))
    }
}

impl TryFrom<String> for SigningSecret {
    type Error = ClientConfigError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        SigningSecret::parse(&raw)
    }
}

// Key material must never end up in logs.
impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningSecret::Plaintext(_) => write!(f, "Plaintext(***)"),
            SigningSecret::Encrypted(_) => write!(f, "Encrypted(***)"),
        }
    }
}

/// Signing configuration of a registered client application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSigningConfig {
    pub client_id: String,

    pub signature_algorithm: SignatureAlgorithm,

    /// Shared key (HMAC) or PKCS#8 PEM private key (RSA/EC).
    pub signing_secret: SigningSecret,

    /// PEM public key, required for RSA/EC algorithms.
    #[serde(default)]
    pub verification_key: Option<String>,

    pub access_token_validity_seconds: u64,

    pub refresh_token_validity_seconds: u64,

    pub token_type: String,

    #[serde(default)]
    pub scope: Option<String>,
}

/// Reasons a client signing configuration is rejected on load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientConfigError {
    #[error("client id is empty")]
    EmptyClientId,

    #[error("access token validity must be positive")]
    NonPositiveAccessValidity,

    #[error("refresh token validity ({refresh}s) must exceed access token validity ({access}s)")]
    RefreshNotAfterAccess { access: u64, refresh: u64 },

    #[error("{0} requires a verification key")]
    MissingVerificationKey(SignatureAlgorithm),

    #[error("{0} is not supported for signing")]
    UnsupportedAlgorithm(SignatureAlgorithm),

    #[error("encrypted signing secret is not valid base64")]
    InvalidEncryptedSecret,
}

impl ClientSigningConfig {
    /// Check the invariants every cached configuration must hold.
    pub fn validate(&self) -> Result<(), ClientConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ClientConfigError::EmptyClientId);
        }
        if self.access_token_validity_seconds == 0 {
            return Err(ClientConfigError::NonPositiveAccessValidity);
        }
        if self.refresh_token_validity_seconds <= self.access_token_validity_seconds {
            return Err(ClientConfigError::RefreshNotAfterAccess {
                access: self.access_token_validity_seconds,
                refresh: self.refresh_token_validity_seconds,
            });
        }
        if self.signature_algorithm.jws_algorithm().is_none() {
            return Err(ClientConfigError::UnsupportedAlgorithm(
                self.signature_algorithm,
            ));
        }
        if self.signature_algorithm.family() != KeyFamily::Hmac && self.verification_key.is_none() {
            return Err(ClientConfigError::MissingVerificationKey(
                self.signature_algorithm,
            ));
        }
        Ok(())
    }

    /// Copy of this configuration carrying already-decrypted key material.
    pub fn with_resolved_secret(&self, key_material: Vec<u8>) -> Self {
        Self {
            signing_secret: SigningSecret::Plaintext(key_material),
            ..self.clone()
        }
    }
}

/// Authorities and extra information the user directory grants a user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserGrant {
    pub authorities: BTreeSet<String>,
    pub additional_info: AdditionalInfo,
}

impl UserGrant {
    pub fn new<I, S>(authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorities: authorities.into_iter().map(Into::into).collect(),
            additional_info: AdditionalInfo::new(),
        }
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Response of a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Seconds until the access token expires.
    pub expires_in: u64,
    #[serde(rename = "jti")]
    pub jwt_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub additional_info: AdditionalInfo,
}

/// Authorization data projected from a validated access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsernameAuthorities {
    pub username: String,
    pub authorities: BTreeSet<String>,
    pub additional_info: AdditionalInfo,
}
