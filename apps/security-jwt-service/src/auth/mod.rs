// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Issues and validates signed access/refresh token pairs on behalf of
//! registered client applications.
//!
//! ## Auth Flow
//!
//! 1. A client application calls `login` with its client id and the user's
//!    credentials
//! 2. The service:
//!    - Resolves the client's signing configuration (cached)
//!    - Verifies the credentials against the user directory
//!    - Rejects blacklisted users
//!    - Signs an access token and a refresh token pointing back at it (`ati`)
//! 3. The refresh token is later exchanged for a fresh pair with `refresh`
//! 4. Resource servers call `authorization_information` with an access token
//!
//! ## Security
//!
//! - Each client has its own algorithm and key; tokens never cross clients
//! - Expiry is strict (`now < exp`) with no clock skew leeway
//! - Signing secrets may be stored encrypted (`{cipher}` prefix)
//! - Every failure ends the request; no token is issued on a partial path

pub mod algorithm;
pub mod cipher;
pub mod claims;
pub mod codec;
pub mod directory;
pub mod error;
pub mod service;

pub use algorithm::{KeyFamily, SignatureAlgorithm};
pub use cipher::{CipherError, SecretCipher};
pub use claims::{ClaimKey, RawTokenClaims, TokenClaims};
pub use codec::{IssuedTokens, TokenCodec, TokenError};
pub use directory::UserDirectory;
pub use error::AuthError;
pub use service::AuthenticationService;
