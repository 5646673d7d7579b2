// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature algorithms a client application can be configured with.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

/// Signature algorithm of a client's tokens.
///
/// ## Families
///
/// - `HS*` - HMAC with a shared secret
/// - `RS*` - RSA PKCS#1 v1.5 with a PEM key pair
/// - `ES*` - ECDSA with a PEM key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
    /// Accepted in stored configuration but has no JWS signer; using it
    /// fails as a configuration error.
    ES512,
}

/// Kind of key material an algorithm needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Hmac,
    Rsa,
    EllipticCurve,
}

impl SignatureAlgorithm {
    pub fn family(&self) -> KeyFamily {
        match self {
            SignatureAlgorithm::HS256 | SignatureAlgorithm::HS384 | SignatureAlgorithm::HS512 => {
                KeyFamily::Hmac
            }
            SignatureAlgorithm::RS256 | SignatureAlgorithm::RS384 | SignatureAlgorithm::RS512 => {
                KeyFamily::Rsa
            }
            SignatureAlgorithm::ES256 | SignatureAlgorithm::ES384 | SignatureAlgorithm::ES512 => {
                KeyFamily::EllipticCurve
            }
        }
    }

    /// The JWS algorithm used on the wire, if one exists.
    pub fn jws_algorithm(&self) -> Option<Algorithm> {
        match self {
            SignatureAlgorithm::HS256 => Some(Algorithm::HS256),
            SignatureAlgorithm::HS384 => Some(Algorithm::HS384),
            SignatureAlgorithm::HS512 => Some(Algorithm::HS512),
            SignatureAlgorithm::RS256 => Some(Algorithm::RS256),
            SignatureAlgorithm::RS384 => Some(Algorithm::RS384),
            SignatureAlgorithm::RS512 => Some(Algorithm::RS512),
            SignatureAlgorithm::ES256 => Some(Algorithm::ES256),
            SignatureAlgorithm::ES384 => Some(Algorithm::ES384),
            SignatureAlgorithm::ES512 => None,
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
