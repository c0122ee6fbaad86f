//! At-rest encryption for persisted items
//!
//! AES-256-GCM with a per-record random 96-bit nonce, stored as a prefix of
//! the ciphertext blob. Keys are either supplied directly (32 bytes) or
//! derived from a password with PBKDF2-HMAC-SHA256.
//!
//! Blob layout: `[12 bytes nonce][ciphertext + 16-byte tag]`.
//!
//! Note: records written by legacy zero-IV stores are not readable; caches
//! must be re-populated after enabling this scheme.

use crate::error::EncryptionError;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

/// Default PBKDF2 iteration count for password-derived keys
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 10_000;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Supported symmetric algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    #[default]
    Aes256,
}

/// Key material and algorithm selection for an encrypting adapter
#[derive(Clone)]
pub struct EncryptionOptions {
    pub algorithm: EncryptionAlgorithm,
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for EncryptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionOptions")
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl EncryptionOptions {
    /// Use a raw 32-byte key
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, EncryptionError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(EncryptionError::MissingKey);
        }
        if key.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKeyLength(key.len()));
        }
        let mut buf = [0u8; KEY_LEN];
        buf.copy_from_slice(key);
        Ok(Self {
            algorithm: EncryptionAlgorithm::Aes256,
            key: buf,
        })
    }

    /// Derive a key from a password with PBKDF2-HMAC-SHA256
    pub fn from_password(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations.max(1), &mut key);
        Self {
            algorithm: EncryptionAlgorithm::Aes256,
            key,
        }
    }

    /// Encrypt a plaintext record; output is `nonce ‖ ciphertext`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a `nonce ‖ ciphertext` record
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if blob.len() < NONCE_LEN {
            return Err(EncryptionError::Decrypt);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| EncryptionError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> EncryptionOptions {
        EncryptionOptions::new([7u8; 32]).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let opts = options();
        let blob = opts.encrypt(b"secret payload").unwrap();
        assert_ne!(&blob[NONCE_LEN..], b"secret payload".as_slice());
        assert_eq!(opts.decrypt(&blob).unwrap(), b"secret payload");
    }

    #[test]
    fn test_nonce_is_random_per_record() {
        let opts = options();
        let a = opts.encrypt(b"same plaintext").unwrap();
        let b = opts.encrypt(b"same plaintext").unwrap();
        // equal plaintexts must not produce equal ciphertexts
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = options().encrypt(b"data").unwrap();
        let other = EncryptionOptions::new([8u8; 32]).unwrap();
        assert_eq!(other.decrypt(&blob), Err(EncryptionError::Decrypt));
    }

    #[test]
    fn test_truncated_blob_fails() {
        let opts = options();
        assert_eq!(opts.decrypt(&[1, 2, 3]), Err(EncryptionError::Decrypt));
    }

    #[test]
    fn test_key_length_validation() {
        assert!(matches!(
            EncryptionOptions::new([0u8; 16]),
            Err(EncryptionError::InvalidKeyLength(16))
        ));
        assert!(matches!(
            EncryptionOptions::new([]),
            Err(EncryptionError::MissingKey)
        ));
    }

    #[test]
    fn test_password_derivation_is_deterministic() {
        let a = EncryptionOptions::from_password("hunter2", b"salt", 1000);
        let b = EncryptionOptions::from_password("hunter2", b"salt", 1000);
        let blob = a.encrypt(b"x").unwrap();
        assert_eq!(b.decrypt(&blob).unwrap(), b"x");

        let c = EncryptionOptions::from_password("hunter2", b"other salt", 1000);
        assert!(c.decrypt(&blob).is_err());
    }
}
