//! Concrete [`ejtp_core::Jack`]/[`ejtp_core::Connection`] adapters: a UDP
//! datagram jack and a TCP stream jack, plus the length-prefixed reframing
//! stream transports need.
//!
//! Nothing here is wired in at link time. Call [`install`] once per process
//! (or per test) to register `"udp4"` and `"tcp4"` factories into
//! `ejtp_client::jack_registry`, so `Client::new(..., make_jack: true)` can
//! bind a real socket for an interface address without `ejtp-client` ever
//! depending on this crate.

mod datagram;
mod error;
mod framing;
mod readiness;
mod stream;

use std::sync::Arc;

use ejtp_core::Router;
use ejtp_proto::Address;

pub use datagram::DatagramJack;
pub use error::TransportError;
pub use framing::{wrap_frame, Framer, FramingError};
pub use stream::{StreamConnection, StreamJack};

/// Register `"udp4"` and `"tcp4"` jack factories, each binding a socket at
/// the interface address's `[host, port]` and feeding decoded frames into
/// `router`.
pub fn install(router: &Arc<Router>) {
    let udp_router = Arc::clone(router);
    ejtp_client::jack_registry::register(
        "udp4",
        Arc::new(move |interface: &Address| {
            let (host, port) = datagram::host_port(interface)?;
            Ok(DatagramJack::bind("udp4", &host, port, Arc::clone(&udp_router))? as Arc<dyn ejtp_core::Jack>)
        }),
    );

    let tcp_router = Arc::clone(router);
    ejtp_client::jack_registry::register(
        "tcp4",
        Arc::new(move |interface: &Address| {
            let (host, port) = datagram::host_port(interface)?;
            Ok(StreamJack::bind("tcp4", &host, port, Arc::clone(&tcp_router))? as Arc<dyn ejtp_core::Jack>)
        }),
    );
}
