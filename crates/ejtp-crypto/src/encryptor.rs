//! The polymorphic cryptographic primitive behind an Identity.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;
use crate::prototype::Prototype;

/// Capability set shared by every concrete encryptor kind (rotate, AES, RSA,
/// ECC). `sign`/`sig_verify` have symmetric-primitive defaults; asymmetric
/// kinds override them with a real signature scheme.
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt `ciphertext`.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Sign `plaintext`. Default: `decrypt(sha256(plaintext))`, which is
    /// only meaningful for symmetric primitives where decrypt and encrypt
    /// share a key; asymmetric kinds override with a dedicated scheme.
    fn sign(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let digest = Sha256::digest(plaintext);
        self.decrypt(&digest)
    }

    /// Verify `sig` over `plaintext`. Default: constant-time comparison
    /// against a freshly produced [`Encryptor::sign`].
    fn sig_verify(&self, plaintext: &[u8], sig: &[u8]) -> Result<bool, CryptoError> {
        let expected = self.sign(plaintext)?;
        if expected.len() != sig.len() {
            return Ok(false);
        }
        Ok(bool::from(expected.ct_eq(sig)))
    }

    /// The serialized form of this encryptor.
    fn proto(&self) -> Prototype;

    /// The public half of this encryptor's prototype. Symmetric primitives
    /// return [`Encryptor::proto`] unchanged — callers must treat that as
    /// shared-secret material, not genuinely public.
    fn public(&self) -> Prototype {
        self.proto()
    }

    /// `proto() == public()`.
    fn is_public(&self) -> bool {
        self.proto() == self.public()
    }

    /// Whether this encryptor holds the key material to encrypt and sign.
    /// True for every kind except an RSA/ECC encryptor built from public key
    /// material alone.
    fn can_encrypt(&self) -> bool {
        true
    }
}

