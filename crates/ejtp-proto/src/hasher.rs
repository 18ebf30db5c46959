//! SHA-1 digest helpers used for checksums and canonical-JSON hashing.
//!
//! The digest algorithm is a protocol constant (SHA-1, not a pluggable
//! choice) — it exists purely to produce stable short identifiers, not as a
//! security boundary.

use sha1::{Digest, Sha1};

use crate::error::ProtoError;
use crate::json::{strict_encode, JsonValue};

/// Hash an already-encoded byte string, returning a lowercase hex digest.
#[must_use]
pub fn make(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write_hex_byte(&mut out, byte);
    }
    out
}

fn write_hex_byte(out: &mut String, byte: u8) -> std::fmt::Result {
    use std::fmt::Write as _;
    write!(out, "{byte:02x}")
}

/// First 6 hex characters of [`make`].
#[must_use]
pub fn make6(data: &[u8]) -> String {
    maken(data, 6)
}

/// First `n` hex characters of [`make`].
#[must_use]
pub fn maken(data: &[u8], n: usize) -> String {
    let full = make(data);
    full.chars().take(n).collect()
}

/// Checksum of a value: the hash of its canonical JSON encoding.
pub fn checksum(value: &JsonValue) -> Result<String, ProtoError> {
    Ok(make(&strict_encode(value)?))
}

/// Digest helper bundle, grouped for callers that want one import.
pub struct Hasher;

impl Hasher {
    /// See [`make`].
    #[must_use]
    pub fn make(data: &[u8]) -> String {
        make(data)
    }

    /// See [`make6`].
    #[must_use]
    pub fn make6(data: &[u8]) -> String {
        make6(data)
    }

    /// See [`maken`].
    #[must_use]
    pub fn maken(data: &[u8], n: usize) -> String {
        maken(data, n)
    }

    /// See [`checksum`].
    pub fn checksum(value: &JsonValue) -> Result<String, ProtoError> {
        checksum(value)
    }
}
