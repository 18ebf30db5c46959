//! Shared-key AEAD encryptor using AES-256-GCM.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::encryptor::Encryptor;
use crate::error::CryptoError;
use crate::prototype::Prototype;

const NONCE_LEN: usize = 12;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(key: &[u8]) -> Result<HmacSha256, CryptoError> {
    HmacSha256::new_from_slice(key).map_err(|e| CryptoError::CipherFailure {
        operation: "sign",
        reason: e.to_string(),
    })
}

/// AES-256-GCM with a 12-byte random nonce prefixed to the ciphertext.
pub struct AesEncryptor {
    key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl AesEncryptor {
    /// Build an AES encryptor from a 32-byte shared key.
    pub fn new(key: Vec<u8>) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::MalformedPrototype {
                kind: "aes",
                reason: format!("key must be 32 bytes, got {}", key.len()),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::CipherFailure {
            operation: "construct",
            reason: e.to_string(),
        })?;
        Ok(Self { key, cipher })
    }
}

impl Encryptor for AesEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext =
            self.cipher
                .encrypt(nonce, plaintext)
                .map_err(|e| CryptoError::CipherFailure {
                    operation: "encrypt",
                    reason: e.to_string(),
                })?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(CryptoError::WrongSize {
                what: "ciphertext",
                expected: NONCE_LEN,
                got: ciphertext.len(),
            });
        }
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, body)
            .map_err(|e| CryptoError::CipherFailure {
                operation: "decrypt",
                reason: e.to_string(),
            })
    }

    /// Overridden rather than relying on the trait default: GCM's
    /// authentication tag means `decrypt(sha256(plaintext))` would fail on
    /// almost any digest, since digests are not valid ciphertexts this key
    /// produced. An HMAC under the same shared key gives the same
    /// "only the key holder can produce this" property without routing
    /// through AEAD.
    fn sign(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = hmac_sha256(&self.key)?;
        mac.update(plaintext);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn sig_verify(&self, plaintext: &[u8], sig: &[u8]) -> Result<bool, CryptoError> {
        let mut mac = hmac_sha256(&self.key)?;
        mac.update(plaintext);
        Ok(mac.verify_slice(sig).is_ok())
    }

    fn proto(&self) -> Prototype {
        Prototype::Aes {
            key: self.key.clone(),
        }
    }
}
