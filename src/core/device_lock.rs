//! Encryption of device lock secrets (passcodes and unlock patterns) taken at intake.
//!
//! Secrets are sealed with AES-256-GCM under a key from the environment and
//! stored as base64 of `nonce || ciphertext || tag`. Each secret gets a fresh
//! random nonce.

use crate::{
    config::server::DEVICE_LOCK_KEY_LEN,
    errors::{Error, Result},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use ring::{
    aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey},
    rand::{SecureRandom, SystemRandom},
};
use std::sync::Arc;

/// Seals and opens device lock secrets.
#[derive(Clone)]
pub struct DeviceLockCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl std::fmt::Debug for DeviceLockCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLockCipher").finish_non_exhaustive()
    }
}

fn crypto_error(message: &str) -> Error {
    Error::Crypto {
        message: message.to_string(),
    }
}

impl DeviceLockCipher {
    /// Creates a cipher from a raw 32-byte key.
    pub fn new(key: &[u8; DEVICE_LOCK_KEY_LEN]) -> Result<Self> {
        let unbound =
            UnboundKey::new(&AES_256_GCM, key).map_err(|_| crypto_error("invalid key length"))?;
        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypts a secret for storage.
    pub fn seal(&self, secret: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| crypto_error("random generator failed"))?;

        let mut in_out = secret.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| crypto_error("encryption failed"))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + in_out.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&in_out);
        Ok(STANDARD.encode(stored))
    }

    /// Decrypts a stored secret.
    ///
    /// # Errors
    /// Returns `Error::Crypto` if the value is malformed, was sealed under a
    /// different key, or has been tampered with.
    pub fn open(&self, stored: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(stored)
            .map_err(|_| crypto_error("stored secret is not valid base64"))?;
        if bytes.len() < NONCE_LEN {
            return Err(crypto_error("stored secret is truncated"));
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| crypto_error("invalid nonce"))?;
        let mut in_out = sealed.to_vec();
        let plain = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| crypto_error("decryption failed"))?;

        String::from_utf8(plain.to_vec()).map_err(|_| crypto_error("secret is not UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_seal_then_open() {
        let cipher = DeviceLockCipher::new(&[7u8; DEVICE_LOCK_KEY_LEN]).unwrap();
        let stored = cipher.seal("1-5-9-6-3").unwrap();

        assert!(!stored.contains("1-5-9-6-3"));
        assert_eq!(cipher.open(&stored).unwrap(), "1-5-9-6-3");
    }

    #[test]
    fn test_same_secret_seals_differently() {
        let cipher = DeviceLockCipher::new(&[7u8; DEVICE_LOCK_KEY_LEN]).unwrap();
        assert_ne!(cipher.seal("0000").unwrap(), cipher.seal("0000").unwrap());
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = DeviceLockCipher::new(&[1u8; DEVICE_LOCK_KEY_LEN])
            .unwrap()
            .seal("2580")
            .unwrap();
        let other = DeviceLockCipher::new(&[2u8; DEVICE_LOCK_KEY_LEN]).unwrap();

        assert!(matches!(other.open(&sealed), Err(Error::Crypto { .. })));
        assert!(matches!(other.open("not base64!"), Err(Error::Crypto { .. })));
    }
}
