//! Identity, `IdentityCache` and Router: the stateful heart of an EJTP
//! process.
//!
//! This crate bridges `ejtp-proto`'s wire-level [`ejtp_proto::IdentityLookup`]
//! seam to a concrete, synchronized [`IdentityCache`], and defines the
//! [`Jack`]/[`Connection`]/[`RoutableClient`] seams that `ejtp-transport` and
//! `ejtp-client` implement without needing to depend on each other.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod router;

pub use cache::IdentityCache;
pub use error::CoreError;
pub use identity::Identity;
pub use router::{Connection, Jack, RoutableClient, Router};
