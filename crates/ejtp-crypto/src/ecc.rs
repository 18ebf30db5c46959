//! X25519 ECDH key agreement plus `ChaCha20Poly1305` AEAD (an ECIES-style
//! construction), with an `Ed25519` signing keypair derived from the same
//! 32-byte seed for the asymmetric sign/verify half of the contract.
//!
//! The source protocol's `ecc` kind wrapped a third-party `pyecc` library
//! with an arbitrary named curve; this is the idiomatic substitute using
//! `x25519-dalek`/`ed25519-dalek`, both operating on Curve25519.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::encryptor::Encryptor;
use crate::error::CryptoError;
use crate::prototype::Prototype;

const NONCE_LEN: usize = 12;
const HKDF_INFO: &[u8] = b"ejtp-ecc-aead-key-v1";

/// An ECC encryptor: X25519 for key agreement, `Ed25519` for signatures.
pub struct EccEncryptor {
    public: [u8; 32],
    private: Option<[u8; 32]>,
    curve: String,
}

impl EccEncryptor {
    /// Build from explicit key material. `private` is `None` for a
    /// public-key-only (verify/encrypt-to, not decrypt/sign) encryptor.
    pub fn new(public: [u8; 32], private: Option<[u8; 32]>, curve: String) -> Self {
        Self {
            public,
            private,
            curve,
        }
    }

    /// Generate a fresh keypair.
    #[must_use]
    pub fn generate(curve: String) -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let secret = StaticSecret::from(seed);
        let public = PublicKey::from(&secret);
        Self {
            public: *public.as_bytes(),
            private: Some(seed),
            curve,
        }
    }

    fn signing_key(&self) -> Result<SigningKey, CryptoError> {
        let seed = self.private.ok_or(CryptoError::NoPrivateKey("sign"))?;
        Ok(SigningKey::from_bytes(&seed))
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        // Ed25519 and X25519 keys are unrelated encodings of the same seed,
        // so recovering the verifying key still requires the seed, not just
        // the X25519 public point. A public-key-only ECC encryptor can
        // therefore encrypt but not verify; see the module's grounding note
        // in DESIGN.md.
        let seed = self.private.ok_or(CryptoError::NoPrivateKey("sig_verify"))?;
        Ok(SigningKey::from_bytes(&seed).verifying_key())
    }
}

impl Encryptor for EccEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut ephemeral_seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ephemeral_seed);
        let ephemeral_secret = StaticSecret::from(ephemeral_seed);
        let ephemeral_public = PublicKey::from(&ephemeral_secret);

        let recipient_public = PublicKey::from(self.public);
        let shared = ephemeral_secret.diffie_hellman(&recipient_public);
        let aead_key = derive_aead_key(shared.as_bytes());
        let cipher = ChaCha20Poly1305::new((&aead_key).into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext =
            cipher
                .encrypt(nonce, plaintext)
                .map_err(|e| CryptoError::CipherFailure {
                    operation: "encrypt",
                    reason: e.to_string(),
                })?;

        let mut out = Vec::with_capacity(32 + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let private = self.private.ok_or(CryptoError::NoPrivateKey("decrypt"))?;
        if ciphertext.len() < 32 + NONCE_LEN {
            return Err(CryptoError::WrongSize {
                what: "ciphertext",
                expected: 32 + NONCE_LEN,
                got: ciphertext.len(),
            });
        }
        let (ephemeral_public_bytes, rest) = ciphertext.split_at(32);
        let (nonce_bytes, body) = rest.split_at(NONCE_LEN);

        let mut ephemeral_public_arr = [0u8; 32];
        ephemeral_public_arr.copy_from_slice(ephemeral_public_bytes);
        let ephemeral_public = PublicKey::from(ephemeral_public_arr);

        let secret = StaticSecret::from(private);
        let shared = secret.diffie_hellman(&ephemeral_public);
        let aead_key = derive_aead_key(shared.as_bytes());
        let cipher = ChaCha20Poly1305::new((&aead_key).into());
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, body)
            .map_err(|e| CryptoError::CipherFailure {
                operation: "decrypt",
                reason: e.to_string(),
            })
    }

    fn sign(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signing_key = self.signing_key()?;
        Ok(signing_key.sign(plaintext).to_bytes().to_vec())
    }

    fn sig_verify(&self, plaintext: &[u8], sig: &[u8]) -> Result<bool, CryptoError> {
        let verifying_key = self.verifying_key()?;
        let sig_bytes: [u8; 64] = sig.try_into().map_err(|_| CryptoError::WrongSize {
            what: "signature",
            expected: 64,
            got: sig.len(),
        })?;
        let signature = Signature::from_bytes(&sig_bytes);
        Ok(verifying_key.verify(plaintext, &signature).is_ok())
    }

    fn proto(&self) -> Prototype {
        Prototype::Ecc {
            public: Some(self.public),
            private: self.private,
            curve: self.curve.clone(),
        }
    }

    fn public(&self) -> Prototype {
        Prototype::Ecc {
            public: Some(self.public),
            private: None,
            curve: self.curve.clone(),
        }
    }

    fn can_encrypt(&self) -> bool {
        self.private.is_some()
    }
}

fn derive_aead_key(shared_secret: &[u8]) -> [u8; 32] {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    let Ok(()) = hkdf.expand(HKDF_INFO, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };
    key
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let recipient = EccEncryptor::generate("curve25519".to_owned());
        let plain = b"onion-wrapped payload";
        let ciphertext = recipient.encrypt(plain).unwrap();
        let restored = recipient.decrypt(&ciphertext).unwrap();
        assert_eq!(restored, plain);
    }

    #[test]
    fn public_only_encryptor_can_encrypt_but_not_decrypt() {
        let full = EccEncryptor::generate("curve25519".to_owned());
        let Prototype::Ecc { public, curve, .. } = full.public() else {
            panic!("expected ecc prototype");
        };
        let public_only = EccEncryptor::new(public.unwrap(), None, curve);
        assert!(!public_only.can_encrypt());

        let ciphertext = public_only.encrypt(b"hi").unwrap();
        assert_eq!(full.decrypt(&ciphertext).unwrap(), b"hi");
        assert!(public_only.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = EccEncryptor::generate("curve25519".to_owned());
        let sig = signer.sign(b"message").unwrap();
        assert!(signer.sig_verify(b"message", &sig).unwrap());
        assert!(!signer.sig_verify(b"tampered", &sig).unwrap());
    }

    #[test]
    fn is_public_is_false_when_private_key_present() {
        let full = EccEncryptor::generate("curve25519".to_owned());
        assert!(!full.is_public());
    }
}
