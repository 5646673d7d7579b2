// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing and verification of access/refresh token pairs.
//!
//! The codec never touches a cache, store or clock it was not handed: the
//! `*_at` variants take the current time explicitly. Key material must already
//! be decrypted (see [`super::cipher::SecretCipher`]).

use std::collections::BTreeSet;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::algorithm::KeyFamily;
use super::claims::{ClaimKey, ClaimsError, RawTokenClaims, TokenClaims};
use crate::models::{AdditionalInfo, ClientSigningConfig, SigningSecret};

/// Reasons a token cannot be issued or accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is malformed: {0}")]
    MalformedToken(String),

    #[error("signing configuration cannot be used: {0}")]
    Configuration(String),
}

impl From<ClaimsError> for TokenError {
    fn from(e: ClaimsError) -> Self {
        TokenError::MalformedToken(e.to_string())
    }
}

/// Output of one issuance.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub claims: RawTokenClaims,
    pub access_token: String,
    pub refresh_token: String,
}

impl IssuedTokens {
    pub fn jwt_id(&self) -> &str {
        self.claims.access_claims.jwt_id().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn issue(
        &self,
        config: &ClientSigningConfig,
        username: &str,
        authorities: &BTreeSet<String>,
        additional_info: &AdditionalInfo,
    ) -> Result<IssuedTokens, TokenError> {
        self.issue_at(
            config,
            username,
            authorities,
            additional_info,
            Utc::now().timestamp(),
        )
    }

    /// Build and sign an access/refresh pair as of `now` (Unix seconds).
    pub fn issue_at(
        &self,
        config: &ClientSigningConfig,
        username: &str,
        authorities: &BTreeSet<String>,
        additional_info: &AdditionalInfo,
        now: i64,
    ) -> Result<IssuedTokens, TokenError> {
        let algorithm = jws_algorithm(config)?;
        let key = encoding_key(config)?;

        let access_expires_at = expiry(now, config.access_token_validity_seconds)?;
        let refresh_expires_at = expiry(now, config.refresh_token_validity_seconds)?;

        let access_jti = Uuid::new_v4().to_string();
        let mut access_claims = TokenClaims::new();
        access_claims.set(ClaimKey::Username, username)?;
        access_claims.set(
            ClaimKey::Authorities,
            authorities
                .iter()
                .cloned()
                .map(Value::String)
                .collect::<Vec<_>>(),
        )?;
        access_claims.set(ClaimKey::JwtId, access_jti.as_str())?;
        access_claims.set(ClaimKey::IssuedAt, now)?;
        access_claims.set(ClaimKey::ExpiresAt, access_expires_at)?;
        if let Some(scope) = &config.scope {
            access_claims.set(ClaimKey::Scope, scope.as_str())?;
        }

        let mut refresh_claims = TokenClaims::new();
        refresh_claims.set(ClaimKey::Username, username)?;
        refresh_claims.set(ClaimKey::JwtId, Uuid::new_v4().to_string())?;
        refresh_claims.set(ClaimKey::AccessJwtId, access_jti.as_str())?;
        refresh_claims.set(ClaimKey::IssuedAt, now)?;
        refresh_claims.set(ClaimKey::ExpiresAt, refresh_expires_at)?;

        let additional_claims: AdditionalInfo = additional_info
            .iter()
            .filter(|(name, _)| ClaimKey::from_name(name).is_none())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let claims = RawTokenClaims {
            access_claims,
            refresh_claims,
            additional_claims,
        };

        let header = Header::new(algorithm);
        let access_token = sign(&header, &claims.access_payload(), &key)?;
        let refresh_token = sign(&header, &claims.refresh_claims, &key)?;

        Ok(IssuedTokens {
            claims,
            access_token,
            refresh_token,
        })
    }

    pub fn validate(
        &self,
        token: &str,
        config: &ClientSigningConfig,
    ) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, config, Utc::now().timestamp())
    }

    /// Verify signature, then expiry (`now < exp`), then claim structure.
    pub fn validate_at(
        &self,
        token: &str,
        config: &ClientSigningConfig,
        now: i64,
    ) -> Result<TokenClaims, TokenError> {
        let algorithm = jws_algorithm(config)?;
        let key = decoding_key(config)?;

        // Expiry is checked below with a strict comparison and no leeway.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let payload = decode::<Map<String, Value>>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::MalformedToken(e.to_string()),
            })?
            .claims;

        let expires_at = payload
            .get(ClaimKey::ExpiresAt.name())
            .and_then(Value::as_i64)
            .ok_or_else(|| TokenError::MalformedToken("missing or invalid `exp`".to_string()))?;
        if now >= expires_at {
            return Err(TokenError::TokenExpired);
        }

        Ok(TokenClaims::from_json(payload)?)
    }
}

fn jws_algorithm(config: &ClientSigningConfig) -> Result<Algorithm, TokenError> {
    config.signature_algorithm.jws_algorithm().ok_or_else(|| {
        TokenError::Configuration(format!(
            "{} is not supported for signing",
            config.signature_algorithm
        ))
    })
}

fn key_material(config: &ClientSigningConfig) -> Result<&[u8], TokenError> {
    match &config.signing_secret {
        SigningSecret::Plaintext(bytes) if !bytes.is_empty() => Ok(bytes),
        SigningSecret::Plaintext(_) => Err(TokenError::Configuration(
            "signing secret is empty".to_string(),
        )),
        SigningSecret::Encrypted(_) => Err(TokenError::Configuration(
            "signing secret has not been decrypted".to_string(),
        )),
    }
}

fn encoding_key(config: &ClientSigningConfig) -> Result<EncodingKey, TokenError> {
    let material = key_material(config)?;
    let key = match config.signature_algorithm.family() {
        KeyFamily::Hmac => Ok(EncodingKey::from_secret(material)),
        KeyFamily::Rsa => EncodingKey::from_rsa_pem(material),
        KeyFamily::EllipticCurve => EncodingKey::from_ec_pem(material),
    };
    key.map_err(|e| TokenError::Configuration(format!("invalid signing key: {e}")))
}

fn decoding_key(config: &ClientSigningConfig) -> Result<DecodingKey, TokenError> {
    if config.signature_algorithm.family() == KeyFamily::Hmac {
        return Ok(DecodingKey::from_secret(key_material(config)?));
    }

    let public_pem = config
        .verification_key
        .as_deref()
        .ok_or_else(|| TokenError::Configuration("verification key is missing".to_string()))?
        .as_bytes();
    let key = match config.signature_algorithm.family() {
        KeyFamily::Rsa => DecodingKey::from_rsa_pem(public_pem),
        _ => DecodingKey::from_ec_pem(public_pem),
    };
    key.map_err(|e| TokenError::Configuration(format!("invalid verification key: {e}")))
}

fn expiry(now: i64, validity_seconds: u64) -> Result<i64, TokenError> {
    i64::try_from(validity_seconds)
        .ok()
        .and_then(|validity| now.checked_add(validity))
        .ok_or_else(|| TokenError::Configuration("token validity is out of range".to_string()))
}

fn sign(header: &Header, claims: &TokenClaims, key: &EncodingKey) -> Result<String, TokenError> {
    encode(header, &claims.to_json(), key)
        .map_err(|e| TokenError::Configuration(format!("could not sign token: {e}")))
}
