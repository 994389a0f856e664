//! Secret encryption for credential fields at rest.
//!
//! Source passwords and API keys never reach the settings document in
//! plaintext. They pass through a [`SecretCipher`]: the production
//! implementation is AES-256-GCM with a fresh random 96-bit nonce per
//! encryption, the nonce prefixed to the ciphertext and the whole blob
//! base64-encoded so it can live inside the TOML document.
//!
//! Decryption failures mean corrupted storage or the wrong key material;
//! neither is recoverable here, so they surface as hard errors.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{generic_array::GenericArray, Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// AES-GCM nonce size in bytes.
const NONCE_LEN: usize = 12;

/// Error type for secret encryption and decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be exactly 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("stored secret is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("decrypted secret is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Reversible transform applied to secret strings before they touch disk.
///
/// `decrypt(encrypt(s)) == s` for every string this crate produces.
pub trait SecretCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
    fn decrypt(&self, stored: &str) -> Result<String, CryptoError>;
}

/// AES-256-GCM implementation of [`SecretCipher`].
pub struct AesGcmCipher {
    key: [u8; 32],
}

impl AesGcmCipher {
    /// Creates a cipher from exactly 32 bytes of key material.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Creates a cipher from a byte slice, validating the length.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] unless `key` is 32 bytes.
    pub fn from_key_bytes(key: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; 32] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Self::new(key))
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend(ciphertext);
        Ok(BASE64.encode(blob))
    }

    fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        let blob = BASE64.decode(stored)?;
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::Decrypt("stored secret too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

        Ok(String::from_utf8(plaintext)?)
    }
}

/// Identity cipher for tests: stores secrets as given.
///
/// Lets service-level tests assert on document contents without key
/// material, the same way the storage mock stands in for the file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCipher;

impl SecretCipher for PlaintextCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, stored: &str) -> Result<String, CryptoError> {
        Ok(stored.to_string())
    }
}
