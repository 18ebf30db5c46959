//! Encryptor primitives for EJTP identities: a polymorphic encrypt/decrypt/
//! sign/verify interface, and the four concrete kinds an Identity's
//! prototype can name (`rotate`, `aes`, `rsa`, `ecc`).
//!
//! This crate knows nothing about addresses, frames, or identity caches —
//! those seams live in `ejtp-proto` and `ejtp-core`. An [`Encryptor`] only
//! ever sees and returns raw bytes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aes;
pub mod ecc;
pub mod encryptor;
pub mod error;
pub mod prototype;
pub mod rotate;
pub mod rsa;

pub use ecc::EccEncryptor;
pub use encryptor::Encryptor;
pub use error::CryptoError;
pub use prototype::Prototype;
pub use rotate::RotateEncryptor;

use std::sync::Arc;

use crate::aes::AesEncryptor;
use crate::rsa::RsaEncryptor;

/// Build a live [`Encryptor`] from its serialized [`Prototype`].
///
/// RSA key generation (`public_der == None && private_der == None`) runs on
/// a background thread; the returned encryptor blocks on first use until
/// the key is ready.
pub fn make(prototype: &Prototype) -> Result<Arc<dyn Encryptor>, CryptoError> {
    match prototype {
        Prototype::Rotate { shift } => Ok(Arc::new(RotateEncryptor::new(*shift))),
        Prototype::Aes { key } => Ok(Arc::new(AesEncryptor::new(key.clone())?)),
        Prototype::Rsa {
            public_der,
            private_der,
        } => match (public_der, private_der) {
            (_, Some(der)) => Ok(Arc::new(RsaEncryptor::from_private_der(der)?)),
            (Some(der), None) => Ok(Arc::new(RsaEncryptor::from_public_der(der)?)),
            (None, None) => Ok(Arc::new(RsaEncryptor::generate(2048))),
        },
        Prototype::Ecc {
            public,
            private,
            curve,
        } => {
            let public = public.ok_or(CryptoError::MalformedPrototype {
                kind: "ecc",
                reason: "missing public key".to_owned(),
            })?;
            Ok(Arc::new(EccEncryptor::new(public, *private, curve.clone())))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn make_dispatches_rotate() {
        let enc = make(&Prototype::Rotate { shift: 4 }).unwrap();
        assert_eq!(enc.encrypt(b"Aquaboogie").unwrap(), b"Euyefsskmi");
    }

    #[test]
    fn make_dispatches_aes() {
        let enc = make(&Prototype::Aes { key: vec![1; 32] }).unwrap();
        let ciphertext = enc.encrypt(b"hello").unwrap();
        assert_eq!(enc.decrypt(&ciphertext).unwrap(), b"hello");
    }

    #[test]
    fn make_dispatches_ecc_generation_requires_public_key() {
        let err = make(&Prototype::Ecc {
            public: None,
            private: None,
            curve: "curve25519".to_owned(),
        })
        .unwrap_err();
        assert!(matches!(err, CryptoError::MalformedPrototype { .. }));
    }

    #[test]
    fn make_dispatches_rsa_generation() {
        let enc = make(&Prototype::Rsa {
            public_der: None,
            private_der: None,
        })
        .unwrap();
        let ciphertext = enc.encrypt(b"hi").unwrap();
        assert_eq!(enc.decrypt(&ciphertext).unwrap(), b"hi");
    }
}
