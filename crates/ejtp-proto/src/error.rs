//! Error taxonomy for frame parsing, decoding and canonical-JSON encoding.

/// Errors raised while parsing, decoding or constructing frames, and while
/// encoding or hashing canonical JSON.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The frame bytes could not be parsed: no NUL header terminator, a
    /// truncated body, or a length field that runs past the available bytes.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The leading type byte has no registered frame kind.
    #[error("unknown frame kind: {0:#04x}")]
    UnknownFrameKind(u8),

    /// A frame kind with this type byte is already registered.
    #[error("frame kind {0:#04x} is already registered")]
    KindAlreadyRegistered(u8),

    /// An encrypted or signed frame named an address absent from the
    /// identity lookup used to decode it.
    #[error("no identity cached for address {0}")]
    NoIdentity(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    BadSignature,

    /// The underlying cryptographic primitive refused the ciphertext.
    #[error("decryption failed: {0}")]
    DecryptError(String),

    /// The decompressor rejected the body, or the compression tag is
    /// unrecognized.
    #[error("compression error: {0}")]
    CompressionError(String),

    /// A value could not be rendered as canonical JSON (e.g. a float that is
    /// not finite, or a map key that cannot round-trip).
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A signature is too long to fit in the 16-bit length prefix used by
    /// `SignedFrame`.
    #[error("signature length {0} does not fit in 16 bits")]
    SignatureTooLong(usize),
}
