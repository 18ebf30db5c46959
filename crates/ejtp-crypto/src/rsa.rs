//! RSA with PKCS1-OAEP encryption and PKCS1-PSS signing.
//!
//! Key generation is expensive enough that the source runs it on a
//! background thread and blocks readers on a lock until it completes. We
//! model the same shape with a `Condvar`-gated state machine: construction
//! spawns the generator and returns immediately; `encrypt`/`decrypt`/`sign`
//! block on the gate the first time they're called before it completes.

use std::sync::{Arc, Condvar, Mutex};

use rand::rngs::OsRng;
use rsa::oaep::Oaep;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pss::{Signature as PssSignature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::encryptor::Encryptor;
use crate::error::CryptoError;
use crate::prototype::Prototype;

enum KeyState {
    Generating,
    Ready(KeyMaterial),
}

#[derive(Clone)]
enum KeyMaterial {
    Private(Arc<RsaPrivateKey>),
    Public(Arc<RsaPublicKey>),
}

impl KeyMaterial {
    fn public_key(&self) -> RsaPublicKey {
        match self {
            Self::Private(key) => key.to_public_key(),
            Self::Public(key) => (**key).clone(),
        }
    }
}

/// An RSA encryptor. Either holds a private key (can encrypt, decrypt, and
/// sign) or only a public key (can only verify and encrypt-to).
pub struct RsaEncryptor {
    gate: Arc<(Mutex<KeyState>, Condvar)>,
}

impl RsaEncryptor {
    /// Build from a PKCS#1 DER-encoded private key.
    pub fn from_private_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs1_der(der).map_err(|e| CryptoError::MalformedPrototype {
            kind: "rsa",
            reason: e.to_string(),
        })?;
        Ok(Self::ready(KeyMaterial::Private(Arc::new(key))))
    }

    /// Build from a PKCS#1 DER-encoded public key.
    pub fn from_public_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_pkcs1_der(der).map_err(|e| CryptoError::MalformedPrototype {
            kind: "rsa",
            reason: e.to_string(),
        })?;
        Ok(Self::ready(KeyMaterial::Public(Arc::new(key))))
    }

    fn ready(material: KeyMaterial) -> Self {
        Self {
            gate: Arc::new((Mutex::new(KeyState::Ready(material)), Condvar::new())),
        }
    }

    /// Generate a fresh `bits`-bit key on a background thread. Returns
    /// immediately with a `Generating` gate; callers block on first use.
    #[must_use]
    pub fn generate(bits: usize) -> Self {
        let gate = Arc::new((Mutex::new(KeyState::Generating), Condvar::new()));
        let worker_gate = Arc::clone(&gate);
        std::thread::spawn(move || {
            let key = RsaPrivateKey::new(&mut OsRng, bits);
            let (lock, condvar) = &*worker_gate;
            #[allow(clippy::expect_used, reason = "generator-gate mutex is never held across a panic")]
            let mut state = lock.lock().expect("rsa key gate mutex poisoned");
            if let Ok(key) = key {
                *state = KeyState::Ready(KeyMaterial::Private(Arc::new(key)));
            }
            condvar.notify_all();
        });
        Self { gate }
    }

    fn material(&self) -> Result<KeyMaterial, CryptoError> {
        let (lock, condvar) = &*self.gate;
        #[allow(clippy::expect_used, reason = "generator-gate mutex is never held across a panic")]
        let mut state = lock.lock().expect("rsa key gate mutex poisoned");
        while matches!(*state, KeyState::Generating) {
            #[allow(clippy::expect_used, reason = "generator-gate mutex is never held across a panic")]
            {
                state = condvar.wait(state).expect("rsa key gate mutex poisoned");
            }
        }
        match &*state {
            KeyState::Ready(material) => Ok(material.clone()),
            KeyState::Generating => Err(CryptoError::KeyGeneration(
                "key gate woke before key was ready".to_owned(),
            )),
        }
    }

    fn private_key(&self) -> Result<Arc<RsaPrivateKey>, CryptoError> {
        match self.material()? {
            KeyMaterial::Private(key) => Ok(key),
            KeyMaterial::Public(_) => Err(CryptoError::NoPrivateKey("decrypt/sign")),
        }
    }
}

impl Encryptor for RsaEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let public = self.material()?.public_key();
        public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|e| CryptoError::CipherFailure {
                operation: "encrypt",
                reason: e.to_string(),
            })
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let private = self.private_key()?;
        private
            .decrypt(Oaep::new::<Sha256>(), ciphertext)
            .map_err(|e| CryptoError::CipherFailure {
                operation: "decrypt",
                reason: e.to_string(),
            })
    }

    fn sign(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let private = self.private_key()?;
        let signing_key = SigningKey::<Sha256>::new((*private).clone());
        let signature = signing_key.sign_with_rng(&mut OsRng, plaintext);
        Ok(signature.to_vec())
    }

    fn sig_verify(&self, plaintext: &[u8], sig: &[u8]) -> Result<bool, CryptoError> {
        let public = self.material()?.public_key();
        let verifying_key = VerifyingKey::<Sha256>::new(public);
        let signature = match PssSignature::try_from(sig) {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify(plaintext, &signature).is_ok())
    }

    fn proto(&self) -> Prototype {
        match self.material() {
            Ok(material) => prototype_of(&material),
            Err(_) => Prototype::Rsa {
                public_der: None,
                private_der: None,
            },
        }
    }

    fn public(&self) -> Prototype {
        match self.material() {
            Ok(material) => Prototype::Rsa {
                public_der: material.public_key().to_pkcs1_der().ok().map(|d| d.as_bytes().to_vec()),
                private_der: None,
            },
            Err(_) => Prototype::Rsa {
                public_der: None,
                private_der: None,
            },
        }
    }

    fn can_encrypt(&self) -> bool {
        matches!(self.material(), Ok(KeyMaterial::Private(_)))
    }
}

fn prototype_of(material: &KeyMaterial) -> Prototype {
    match material {
        KeyMaterial::Private(key) => Prototype::Rsa {
            public_der: key.to_public_key().to_pkcs1_der().ok().map(|d| d.as_bytes().to_vec()),
            private_der: key.to_pkcs1_der().ok().map(|d| d.as_bytes().to_vec()),
        },
        KeyMaterial::Public(key) => Prototype::Rsa {
            public_der: key.to_pkcs1_der().ok().map(|d| d.as_bytes().to_vec()),
            private_der: None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_key() -> RsaEncryptor {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        RsaEncryptor::ready(KeyMaterial::Private(Arc::new(private)))
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let enc = test_key();
        let plain = b"rsa payload";
        let ciphertext = enc.encrypt(plain).unwrap();
        let restored = enc.decrypt(&ciphertext).unwrap();
        assert_eq!(restored, plain);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let enc = test_key();
        let sig = enc.sign(b"message").unwrap();
        assert!(enc.sig_verify(b"message", &sig).unwrap());
        assert!(!enc.sig_verify(b"tampered", &sig).unwrap());
    }

    #[test]
    fn public_only_cannot_decrypt_or_sign() {
        let full = test_key();
        let public_der = full
            .material()
            .unwrap()
            .public_key()
            .to_pkcs1_der()
            .unwrap()
            .as_bytes()
            .to_vec();
        let public_only = RsaEncryptor::from_public_der(&public_der).unwrap();
        assert!(!public_only.can_encrypt());
        assert!(public_only.decrypt(b"anything").is_err());
        assert!(public_only.sign(b"anything").is_err());
    }

    #[test]
    fn public_only_can_encrypt_and_verify() {
        let full = test_key();
        let public_der = full
            .material()
            .unwrap()
            .public_key()
            .to_pkcs1_der()
            .unwrap()
            .as_bytes()
            .to_vec();
        let public_only = RsaEncryptor::from_public_der(&public_der).unwrap();

        let ciphertext = public_only.encrypt(b"secret").unwrap();
        assert_eq!(full.decrypt(&ciphertext).unwrap(), b"secret");

        let sig = full.sign(b"message").unwrap();
        assert!(public_only.sig_verify(b"message", &sig).unwrap());
    }

    #[test]
    fn generate_blocks_callers_until_key_is_ready() {
        let enc = RsaEncryptor::generate(1024);
        let plain = b"generated key";
        let ciphertext = enc.encrypt(plain).unwrap();
        let restored = enc.decrypt(&ciphertext).unwrap();
        assert_eq!(restored, plain);
    }
}
