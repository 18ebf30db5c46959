//! Error taxonomy for jack/connection construction, address parsing, and
//! socket I/O.

use ejtp_core::CoreError;
use ejtp_proto::ProtoError;

/// Errors raised while binding a jack's socket, parsing the address it's
/// asked to serve, or sending/receiving bytes over it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An address's transport-specific details weren't the `[host, port]`
    /// pair this jack's transport family expects.
    #[error("invalid transport address: {0}")]
    InvalidAddress(String),

    /// A socket or thread-spawn operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Propagated from frame parsing or canonical-JSON encoding, e.g. while
    /// exporting a remote address to its cache key.
    #[error(transparent)]
    Proto(#[from] ProtoError),
}

impl From<TransportError> for CoreError {
    fn from(error: TransportError) -> Self {
        CoreError::Delivery(error.to_string())
    }
}
