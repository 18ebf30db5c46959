//! Client: an addressed, identity-bearing endpoint that wraps outbound JSON
//! in encryption/signature layers and unwraps inbound frames down to their
//! JSON payload.
//!
//! This crate depends on `ejtp-core` for the [`ejtp_core::Router`] it
//! registers with and the [`ejtp_core::Jack`] seam its [`jack_registry`]
//! resolves against, but never on `ejtp-transport` directly — concrete jacks
//! register themselves into [`jack_registry`] at process setup time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod jack_registry;

pub use client::{Client, RcvCallback};
pub use error::ClientError;
