//! Byte-wise additive shift. Demonstration cipher only; carries no real
//! secrecy since the shift is a single small integer.

use crate::encryptor::Encryptor;
use crate::error::CryptoError;
use crate::prototype::Prototype;

/// A shift-by-`n` cipher: `encrypt` adds `n` to each byte mod 256, `decrypt`
/// subtracts it.
#[derive(Debug, Clone, Copy)]
pub struct RotateEncryptor {
    shift: i32,
}

impl RotateEncryptor {
    /// Build a rotate encryptor with the given shift.
    #[must_use]
    pub fn new(shift: i32) -> Self {
        Self { shift }
    }

    fn apply(&self, data: &[u8], shift: i32) -> Vec<u8> {
        data.iter()
            .map(|&b| (i32::from(b) + shift).rem_euclid(256) as u8)
            .collect()
    }
}

impl Encryptor for RotateEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.apply(plaintext, self.shift))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.apply(ciphertext, -self.shift))
    }

    fn proto(&self) -> Prototype {
        Prototype::Rotate { shift: self.shift }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seed_s2_shift_four_matches_known_vector() {
        let enc = RotateEncryptor::new(4);
        let ciphertext = enc.encrypt(b"Aquaboogie").unwrap();
        assert_eq!(ciphertext, b"Euyefsskmi");
    }

    #[test]
    fn decrypt_inverts_encrypt() {
        let enc = RotateEncryptor::new(17);
        let plain = b"round trip me";
        let ciphertext = enc.encrypt(plain).unwrap();
        let restored = enc.decrypt(&ciphertext).unwrap();
        assert_eq!(restored, plain);
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let enc = RotateEncryptor::new(9);
        let sig = enc.sign(b"message").unwrap();
        assert!(enc.sig_verify(b"message", &sig).unwrap());
        assert!(!enc.sig_verify(b"tampered", &sig).unwrap());
    }

    #[test]
    fn proto_is_its_own_public_half() {
        let enc = RotateEncryptor::new(3);
        assert!(enc.is_public());
    }
}
