//! Error taxonomy for identities, the identity cache, and the router.

use ejtp_crypto::CryptoError;
use ejtp_proto::ProtoError;

/// Errors raised while building identities, reading/writing an
/// [`crate::IdentityCache`], or dispatching through a [`crate::Router`].
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Propagated from frame parsing, decoding, or canonical-JSON encoding.
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// Propagated from an `Encryptor` primitive.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A cache entry's `location` does not stringify to the key it was
    /// stored or looked up under.
    #[error("identity location {location} does not match cache key {key}")]
    AddressMismatch {
        /// The key the entry was stored or looked up under.
        key: String,
        /// The string form the entry's own location produced.
        location: String,
    },

    /// `deserialize` found a record whose own `location` field doesn't match
    /// the object key it was filed under.
    #[error("cache entry under key {key} names location {location}")]
    MismatchedKey {
        /// The JSON object key the record was filed under.
        key: String,
        /// The string form of the record's own `location` field.
        location: String,
    },

    /// A jack or client is already registered under this key.
    #[error("{0} is already loaded")]
    AlreadyLoaded(String),

    /// No jack, connection, or client is registered under this key.
    #[error("no {kind} registered for {key}")]
    NotLoaded {
        /// What kind of entry was being looked up (`"jack"`, `"client"`, ...).
        kind: &'static str,
        /// The key that was looked up.
        key: String,
    },

    /// An identity's encryptor prototype failed to parse from, or render
    /// to, its JSON list form.
    #[error("malformed encryptor prototype: {0}")]
    MalformedPrototype(String),

    /// Reading or writing an identity cache file failed.
    #[error("identity cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A [`crate::router::RoutableClient`] or [`crate::router::Connection`]
    /// implementation's own, richer error, flattened to a string at the
    /// `ejtp-core` seam so downstream crates (e.g. `ejtp-client`) don't have
    /// to make `ejtp-core` aware of their error types.
    #[error("delivery failed: {0}")]
    Delivery(String),
}
