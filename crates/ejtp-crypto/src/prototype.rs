//! The serialized, kind-tagged form of an [`crate::Encryptor`].
//!
//! A [`Prototype`] is the canonical description of an encryptor: enough to
//! reconstruct it via [`crate::make`]. Upstream (`ejtp-core`) converts
//! between this type and the JSON list form `[kind, ...args]` used in
//! identity cache entries; this crate never touches JSON directly.

/// A kind-tagged encryptor description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prototype {
    /// Byte-wise additive shift. Demo cipher only, carries no real secrecy.
    Rotate {
        /// The shift applied to each byte, mod 256.
        shift: i32,
    },
    /// Shared-key AEAD.
    Aes {
        /// The shared symmetric key.
        key: Vec<u8>,
    },
    /// RSA with PKCS1-OAEP encryption and PKCS1-PSS signing.
    Rsa {
        /// PKCS#1 DER of the public key, if known.
        public_der: Option<Vec<u8>>,
        /// PKCS#1 DER of the private key, if held.
        private_der: Option<Vec<u8>>,
    },
    /// X25519 ECDH plus `ChaCha20Poly1305` AEAD, with an `Ed25519` signing
    /// keypair derived from the same seed.
    Ecc {
        /// The 32-byte Montgomery-form public key.
        public: Option<[u8; 32]>,
        /// The 32-byte static secret, if held.
        private: Option<[u8; 32]>,
        /// Curve identifier, carried for round-trip fidelity with the
        /// original prototype shape. Always `"curve25519"` for encryptors
        /// this crate constructs.
        curve: String,
    },
}

impl Prototype {
    /// The `kind` tag used in the list form `[kind, ...args]`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "rotate",
            Self::Aes { .. } => "aes",
            Self::Rsa { .. } => "rsa",
            Self::Ecc { .. } => "ecc",
        }
    }
}
