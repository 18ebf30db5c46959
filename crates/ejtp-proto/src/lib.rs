//! Wire-level building blocks for EJTP: canonical JSON, the SHA-1 hasher,
//! addresses, and the self-delimiting frame codec with its kind registry.
//!
//! This crate has no knowledge of cryptography or identity lookup beyond the
//! narrow [`IdentityLookup`] seam that the encrypted/signed frame kinds need
//! in order to decode. Concrete identities and encryptors live upstream in
//! `ejtp-core` and `ejtp-crypto`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod error;
pub mod frame;
pub mod hasher;
pub mod json;
pub mod registry;

pub use address::Address;
pub use error::ProtoError;
pub use frame::{Category, Frame, IdentityLookup};
pub use hasher::Hasher;
pub use json::JsonValue;
