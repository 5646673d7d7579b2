// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decryption of signing secrets stored as `{cipher}` values.
//!
//! ## Envelope
//!
//! `nonce || ciphertext || tag` using AES-256-GCM, written in base64 after the
//! `{cipher}` prefix. The AES key is the SHA-256 digest of the configured
//! master key.

use base64ct::{Base64, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use crate::models::{SigningSecret, CIPHER_SECRET_PREFIX};

/// Errors raised while resolving a signing secret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("encrypted secret found but no master key is configured")]
    MissingMasterKey,

    #[error("encrypted secret is too short")]
    Truncated,

    #[error("encrypted secret could not be authenticated")]
    DecryptionFailed,

    #[error("could not encrypt secret")]
    EncryptionFailed,
}

/// Resolves at-rest signing secrets into usable key material.
#[derive(Clone)]
pub struct SecretCipher {
    key: Option<[u8; 32]>,
}

impl SecretCipher {
    pub fn new(master_key: &str) -> Self {
        Self {
            key: Some(Sha256::digest(master_key.as_bytes()).into()),
        }
    }

    /// Cipher without a master key; every encrypted secret fails to resolve.
    pub fn plaintext_only() -> Self {
        Self { key: None }
    }

    pub fn from_master_key(master_key: Option<&str>) -> Self {
        master_key.map_or_else(Self::plaintext_only, Self::new)
    }

    /// Return the key bytes of a secret, decrypting it when needed.
    pub fn decrypt(&self, secret: &SigningSecret) -> Result<Vec<u8>, CipherError> {
        match secret {
            SigningSecret::Plaintext(bytes) => Ok(bytes.clone()),
            SigningSecret::Encrypted(envelope) => self.open(envelope),
        }
    }

    /// Produce the `{cipher}` string form for a plaintext secret.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let key = self.sealing_key()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| CipherError::EncryptionFailed)?;

        let mut envelope = nonce_bytes.to_vec();
        envelope.extend_from_slice(&in_out);
        Ok(format!("{CIPHER_SECRET_PREFIX}{}", Base64::encode_string(&envelope)))
    }

    fn open(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
        let key = self.sealing_key()?;

        if bytes.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CipherError::Truncated);
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CipherError::Truncated)?;

        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CipherError::DecryptionFailed)?;
        Ok(plaintext.to_vec())
    }

    fn sealing_key(&self) -> Result<LessSafeKey, CipherError> {
        let key = self.key.as_ref().ok_or(CipherError::MissingMasterKey)?;
        let unbound =
            UnboundKey::new(&AES_256_GCM, key).map_err(|_| CipherError::DecryptionFailed)?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("master_key", &self.key.map(|_| "***"))
            .finish()
    }
}
