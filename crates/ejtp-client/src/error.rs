//! Error taxonomy for the client-side wrap/sign/encrypt and
//! unpack/verify/deliver pipelines.

use ejtp_core::CoreError;
use ejtp_crypto::CryptoError;
use ejtp_proto::ProtoError;

/// Errors raised while building outbound frames, or while unpacking and
/// delivering inbound ones.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Propagated from frame parsing, decoding, or canonical-JSON encoding.
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// Propagated from an `Encryptor` primitive.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Propagated from the identity cache or router.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// `owrite_json`/`sign`/`encryptor_set` named an address absent from
    /// the identity cache.
    #[error("no identity cached for {0}")]
    NoIdentity(String),

    /// A frame kind reached client-side delivery that isn't one of
    /// `EncryptedFrame`, `SignedFrame`, or `JSONFrame`.
    #[error("unexpected frame kind {0:#04x} at client delivery")]
    UnexpectedFrame(u8),

    /// An `EncryptedFrame`/`SignedFrame` unpacked directly to a JSON value
    /// instead of nested frame bytes; this would mean the registry is
    /// misconfigured, since only `JSONFrame` is terminal.
    #[error("expected a nested frame, got a terminal JSON value")]
    ExpectedNestedFrame,
}

impl From<ClientError> for CoreError {
    fn from(error: ClientError) -> Self {
        CoreError::Delivery(error.to_string())
    }
}
