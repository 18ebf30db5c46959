//! Helpers for standing up a router + client bound to a real loopback
//! socket, for scenario tests that exercise `ejtp-transport` end to end
//! rather than a single in-process router.

use std::net::UdpSocket;
use std::sync::Arc;

use ejtp_client::Client;
use ejtp_core::{IdentityCache, Router};
use ejtp_proto::{Address, JsonValue};

/// A free loopback port, found by a throwaway bind-then-drop. Good enough
/// for tests; a real server picks its own port up front.
#[must_use]
pub fn free_port() -> u16 {
    #[allow(clippy::expect_used, reason = "binding an ephemeral port to discover a free one does not fail in a test helper")]
    let socket = UdpSocket::bind(("127.0.0.1", 0)).expect("failed to bind an ephemeral probe socket");
    #[allow(clippy::expect_used, reason = "a socket that just bound successfully has a local address")]
    socket.local_addr().expect("bound socket has a local address").port()
}

/// A `udp4` address at `127.0.0.1:port`.
#[must_use]
pub fn udp_addr(port: u16) -> Address {
    Address::new("udp4", JsonValue::array([JsonValue::string("127.0.0.1"), JsonValue::Int(i64::from(port))]), None)
}

/// A `tcp4` address at `127.0.0.1:port`.
#[must_use]
pub fn tcp_addr(port: u16) -> Address {
    Address::new("tcp4", JsonValue::array([JsonValue::string("127.0.0.1"), JsonValue::Int(i64::from(port))]), None)
}

/// A fresh router with `ejtp-transport`'s `"udp4"`/`"tcp4"` factories
/// installed, and a client bound (and, for stream transports, listening) at
/// `address`.
#[must_use]
pub fn node(address: Address) -> Arc<Client> {
    let router = Arc::new(Router::new(Arc::new(IdentityCache::new())));
    ejtp_transport::install(&router);
    #[allow(clippy::expect_used, reason = "binding a client at a freshly chosen free port does not fail in a test helper")]
    Client::new(router, address, None, true).expect("failed to construct client")
}
