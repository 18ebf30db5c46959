//! Error taxonomy for encryptor construction, encryption, and signing.

/// Errors raised while constructing an [`crate::Encryptor`] from a
/// [`crate::Prototype`], or while using one.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// A prototype's argument list didn't match what its kind expects.
    #[error("malformed prototype for {kind}: {reason}")]
    MalformedPrototype {
        /// The prototype kind tag (`"rotate"`, `"aes"`, ...).
        kind: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Encryption or decryption failed at the underlying cipher.
    #[error("{operation} failed: {reason}")]
    CipherFailure {
        /// `"encrypt"` or `"decrypt"`.
        operation: &'static str,
        /// The underlying library's error, rendered as text.
        reason: String,
    },

    /// This encryptor cannot sign or encrypt because it holds only public
    /// key material.
    #[error("encryptor lacks the private key material required to {0}")]
    NoPrivateKey(&'static str),

    /// RSA key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Ciphertext or signature was the wrong length for this encryptor.
    #[error("wrong size for {what}: expected {expected}, got {got}")]
    WrongSize {
        /// What was measured (`"ciphertext"`, `"signature"`, ...).
        what: &'static str,
        /// The size this encryptor requires.
        expected: usize,
        /// The size actually given.
        got: usize,
    },
}
