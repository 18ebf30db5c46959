//! The in-process dispatcher: demultiplexes inbound frames and hosts jacks,
//! connections and clients.
//!
//! `Router` knows nothing about sockets or client callback semantics —
//! those seams are the [`Jack`]/[`Connection`]/[`RoutableClient`] traits,
//! implemented downstream by `ejtp-transport` and `ejtp-client`. This keeps
//! the dependency graph a DAG: `ejtp-core` defines the seams, the crates
//! that need concrete transports and callbacks depend on `ejtp-core`, not
//! the other way around.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use ejtp_proto::json::strict_string;
use ejtp_proto::registry::create_frame;
use ejtp_proto::{Address, Category, Frame, JsonValue};

use crate::cache::IdentityCache;
use crate::error::CoreError;

/// A transport adapter: the glue between a kernel socket family and the
/// router. Datagram jacks (UDP) route frames with one send per frame;
/// stream jacks (TCP) hand off to a [`Connection`] per peer.
pub trait Jack: Send + Sync {
    /// The transport family tag this jack serves, e.g. `"udp4"`, `"tcp"`.
    fn addrtype(&self) -> &str;

    /// The local bind details this jack is keyed under, if the transport
    /// requires binding to a specific `(host, port)`. `None` for transports
    /// that route purely by type (e.g. the in-process `"local"` jack).
    fn bind_details(&self) -> Option<JsonValue>;

    /// Send `frame` to its own address's destination over this transport.
    fn route(&self, frame: &Frame) -> Result<(), CoreError>;

    /// Obtain or create an outbound [`Connection`] to `remote`, for stream
    /// transports. Datagram jacks that don't model connections at all
    /// should return [`CoreError::NotLoaded`].
    fn open_connection(&self, remote: &Address) -> Result<Arc<dyn Connection>, CoreError>;

    /// Stop this jack's background threads and release its socket.
    fn close(&self) -> Result<(), CoreError>;
}

/// A per-peer stream-transport session. Performs length-prefixed reframing
/// on its own read loop; `send` hands a frame to the write side.
pub trait Connection: Send + Sync {
    /// The peer address this connection is open to.
    fn remote(&self) -> &Address;

    /// Queue `frame` for delivery to [`Connection::remote`].
    fn send(&self, frame: &Frame) -> Result<(), CoreError>;

    /// Close the underlying stream and stop its read loop.
    fn close(&self);
}

/// An in-process endpoint the router can hand decoded, still-wrapped frames
/// to. Implemented by `ejtp-client`'s `Client`.
pub trait RoutableClient: Send + Sync {
    /// The address this client is registered under.
    fn address(&self) -> &Address;

    /// Hand `frame` to this client for unwrapping and delivery to its
    /// `rcv_callback`.
    fn route(&self, frame: Frame) -> Result<(), CoreError>;
}

type JackKey = (String, Option<String>);

/// The dispatcher: three maps (jacks, connections, clients) plus a shared
/// [`IdentityCache`].
///
/// Imposes no ordering between concurrent [`Router::recv`] calls; callers
/// must treat delivery as interleavable. Each map is mutated only under its
/// own lock, so a slow jack lookup never blocks a client registration.
pub struct Router {
    jacks: Mutex<HashMap<JackKey, Arc<dyn Jack>>>,
    connections: Mutex<HashMap<String, Arc<dyn Connection>>>,
    clients: Mutex<HashMap<String, Arc<dyn RoutableClient>>>,
    identities: Arc<IdentityCache>,
}

impl Router {
    /// A router with no jacks, connections, or clients, backed by a fresh
    /// [`IdentityCache`].
    #[must_use]
    pub fn new(identities: Arc<IdentityCache>) -> Self {
        Self {
            jacks: Mutex::new(HashMap::new()),
            connections: Mutex::new(HashMap::new()),
            clients: Mutex::new(HashMap::new()),
            identities,
        }
    }

    /// The identity cache this router's clients share by reference.
    #[must_use]
    pub fn identities(&self) -> &Arc<IdentityCache> {
        &self.identities
    }

    /// Parse `bytes` as a frame and dispatch it. Unparseable input is
    /// logged at `info` and dropped, not propagated — this is the router's
    /// one untrusted boundary, and per-packet garbage must not be fatal.
    pub fn recv(&self, bytes: &[u8]) -> Result<(), CoreError> {
        let frame = match create_frame(bytes::Bytes::copy_from_slice(bytes), Vec::new()) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::info!(%error, "dropping unparseable frame");
                return Ok(());
            }
        };
        self.dispatch(frame)
    }

    /// Dispatch an already-parsed frame, e.g. one produced in-process by
    /// another client rather than read off a socket.
    pub fn recv_frame(&self, frame: Frame) -> Result<(), CoreError> {
        self.dispatch(frame)
    }

    fn dispatch(&self, frame: Frame) -> Result<(), CoreError> {
        match frame.category() {
            Category::Receiver => self.dispatch_to_recipient(frame),
            Category::Sender => {
                let from = frame
                    .address()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "<unparseable address>".to_owned());
                tracing::info!(from, "received a signed frame directly; dropping at the router");
                Ok(())
            }
            Category::None => {
                tracing::info!("dropping frame of unroutable kind at the router boundary");
                Ok(())
            }
        }
    }

    fn dispatch_to_recipient(&self, frame: Frame) -> Result<(), CoreError> {
        let address = match frame.address() {
            Ok(address) => address,
            Err(error) => {
                tracing::info!(%error, "dropping receiver-category frame with unparseable header");
                return Ok(());
            }
        };
        let key = address.export()?;

        if let Some(client) = self.clients.lock_table().get(&key).cloned() {
            guarded_call(|| client.route(frame), &key);
            return Ok(());
        }
        if let Some(connection) = self.connections.lock_table().get(&key).cloned() {
            guarded_call(|| connection.send(&frame), &key);
            return Ok(());
        }
        // Neither a local client nor an established stream connection: fall
        // back to a jack serving this address's transport family, for
        // datagram sends that don't model a persistent `Connection` at all.
        let jack = self
            .jacks
            .lock_table()
            .iter()
            .find(|(jack_key, _)| jack_key.0 == address.addrtype())
            .map(|(_, jack)| Arc::clone(jack));
        if let Some(jack) = jack {
            guarded_call(|| jack.route(&frame), &key);
            return Ok(());
        }
        tracing::warn!(address = %key, "could not deliver frame: no client, connection, or jack registered");
        Ok(())
    }

    /// Link `jack` to this router and register it under its
    /// `(addrtype, bind_details)` key. Fails with [`CoreError::AlreadyLoaded`]
    /// if that key is already taken.
    pub fn load_jack(&self, jack: Arc<dyn Jack>) -> Result<(), CoreError> {
        let key = jack_key(&*jack)?;
        let mut table = self.jacks.lock_table();
        if table.contains_key(&key) {
            return Err(CoreError::AlreadyLoaded(format!("jack {key:?}")));
        }
        table.insert(key, jack);
        Ok(())
    }

    /// Unregister `jack`, the symmetric inverse of [`Router::load_jack`].
    pub fn unload_jack(&self, jack: &dyn Jack) -> Result<(), CoreError> {
        let key = jack_key(jack)?;
        self.jacks.lock_table().remove(&key);
        Ok(())
    }

    /// Register `client` under the string form of its own address. Fails
    /// with [`CoreError::AlreadyLoaded`] if that address is already taken.
    pub fn load_client(&self, client: Arc<dyn RoutableClient>) -> Result<(), CoreError> {
        let key = client.address().export()?;
        let mut table = self.clients.lock_table();
        if table.contains_key(&key) {
            return Err(CoreError::AlreadyLoaded(format!("client {key}")));
        }
        table.insert(key, client);
        Ok(())
    }

    /// Unregister the client at `address`, if any.
    pub fn kill_client(&self, address: &Address) -> Result<(), CoreError> {
        let key = address.export()?;
        self.clients.lock_table().remove(&key);
        Ok(())
    }

    /// Obtain or create a stream [`Connection`] to `addr`: finds a jack
    /// serving `addr`'s transport family, asks it to open the connection,
    /// registers the result, and returns it.
    pub fn connect(&self, addr: &Address) -> Result<Arc<dyn Connection>, CoreError> {
        let key = addr.export()?;
        if let Some(existing) = self.connections.lock_table().get(&key) {
            return Ok(Arc::clone(existing));
        }
        let jack = self
            .jacks
            .lock_table()
            .iter()
            .find(|(key, _)| key.0 == addr.addrtype())
            .map(|(_, jack)| Arc::clone(jack))
            .ok_or_else(|| CoreError::NotLoaded {
                kind: "jack",
                key: addr.addrtype().to_owned(),
            })?;
        let connection = jack.open_connection(addr)?;
        self.connections.lock_table().insert(key, Arc::clone(&connection));
        Ok(connection)
    }

    /// The client registered at `address`, if any.
    #[must_use]
    pub fn client(&self, address: &Address) -> Option<Arc<dyn RoutableClient>> {
        let key = address.export().ok()?;
        self.clients.lock_table().get(&key).cloned()
    }

    /// The connection registered for `address`, if any.
    #[must_use]
    pub fn connection(&self, address: &Address) -> Option<Arc<dyn Connection>> {
        let key = address.export().ok()?;
        self.connections.lock_table().get(&key).cloned()
    }
}

fn jack_key(jack: &dyn Jack) -> Result<JackKey, CoreError> {
    let details = jack.bind_details().map(|v| strict_string(&v)).transpose()?;
    Ok((jack.addrtype().to_owned(), details))
}

/// Run `f`, catching both a returned error and a panic; either is logged at
/// `warn` and swallowed so a misbehaving client or connection cannot tear
/// down the router.
fn guarded_call(f: impl FnOnce() -> Result<(), CoreError>, address: &str) {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(address, %error, "recipient failed to handle frame");
        }
        Err(_) => {
            tracing::warn!(address, "recipient panicked while handling frame");
        }
    }
}

trait LockTable<K, V> {
    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<K, V>>;
}

impl<K, V> LockTable<K, V> for Mutex<HashMap<K, V>> {
    #[allow(clippy::expect_used, reason = "router table mutex is never held across a panic")]
    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<K, V>> {
        self.lock().expect("router table mutex poisoned")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ejtp_crypto::Prototype;
    use ejtp_proto::frame::make_json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingClient {
        address: Address,
        received: Mutex<Vec<Frame>>,
    }

    impl RecordingClient {
        fn new(address: Address) -> Arc<Self> {
            Arc::new(Self {
                address,
                received: Mutex::new(Vec::new()),
            })
        }
    }

    impl RoutableClient for RecordingClient {
        fn address(&self) -> &Address {
            &self.address
        }

        fn route(&self, frame: Frame) -> Result<(), CoreError> {
            self.received.lock_table_vec().push(frame);
            Ok(())
        }
    }

    trait LockVec {
        fn lock_table_vec(&self) -> std::sync::MutexGuard<'_, Vec<Frame>>;
    }
    impl LockVec for Mutex<Vec<Frame>> {
        fn lock_table_vec(&self) -> std::sync::MutexGuard<'_, Vec<Frame>> {
            self.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    struct PanickingClient {
        address: Address,
    }

    impl RoutableClient for PanickingClient {
        fn address(&self) -> &Address {
            &self.address
        }

        fn route(&self, _frame: Frame) -> Result<(), CoreError> {
            panic!("this client always panics");
        }
    }

    struct CountingJack {
        addrtype: &'static str,
        opens: AtomicUsize,
    }

    impl Jack for CountingJack {
        fn addrtype(&self) -> &str {
            self.addrtype
        }

        fn bind_details(&self) -> Option<JsonValue> {
            None
        }

        fn route(&self, _frame: &Frame) -> Result<(), CoreError> {
            Ok(())
        }

        fn open_connection(&self, remote: &Address) -> Result<Arc<dyn Connection>, CoreError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubConnection {
                remote: remote.clone(),
            }))
        }

        fn close(&self) -> Result<(), CoreError> {
            Ok(())
        }
    }

    struct StubConnection {
        remote: Address,
    }

    impl Connection for StubConnection {
        fn remote(&self) -> &Address {
            &self.remote
        }

        fn send(&self, _frame: &Frame) -> Result<(), CoreError> {
            Ok(())
        }

        fn close(&self) {}
    }

    fn addr(callsign: &str) -> Address {
        Address::new("local", JsonValue::Null, Some(JsonValue::string(callsign)))
    }

    fn cache_with(identity_name: &str, addr: &Address) -> Arc<IdentityCache> {
        let cache = Arc::new(IdentityCache::new());
        cache
            .put(crate::identity::Identity::new(
                identity_name,
                addr.clone(),
                Prototype::Rotate { shift: 1 },
            ))
            .unwrap();
        cache
    }

    #[test]
    fn delivers_encrypted_frame_to_registered_client() {
        let recipient_addr = addr("bob");
        let identities = cache_with("bob", &recipient_addr);
        let router = Router::new(identities);

        let client = RecordingClient::new(recipient_addr.clone());
        router.load_client(client.clone()).unwrap();

        let frame = ejtp_proto::frame::make_encrypted(&recipient_addr, b"ciphertext").unwrap();
        router.recv_frame(frame).unwrap();

        assert_eq!(client.received.lock_table_vec().len(), 1);
    }

    #[test]
    fn drops_to_nowhere_when_no_recipient_registered() {
        let recipient_addr = addr("ghost");
        let identities = Arc::new(IdentityCache::new());
        let router = Router::new(identities);

        let frame = ejtp_proto::frame::make_encrypted(&recipient_addr, b"ciphertext").unwrap();
        assert!(router.recv_frame(frame).is_ok());
    }

    #[test]
    fn recv_drops_unparseable_bytes_without_erroring() {
        let router = Router::new(Arc::new(IdentityCache::new()));
        assert!(router.recv(b"\xff not a frame").is_ok());
    }

    #[test]
    fn top_level_json_frame_is_dropped_at_router() {
        let router = Router::new(Arc::new(IdentityCache::new()));
        let frame = make_json(&JsonValue::string("hello")).unwrap();
        assert!(router.recv_frame(frame).is_ok());
    }

    #[test]
    fn load_jack_rejects_duplicate_key() {
        let router = Router::new(Arc::new(IdentityCache::new()));
        let jack = Arc::new(CountingJack {
            addrtype: "udp4",
            opens: AtomicUsize::new(0),
        });
        router.load_jack(jack.clone()).unwrap();
        let err = router.load_jack(jack).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyLoaded(_)));
    }

    #[test]
    fn load_client_rejects_duplicate_address() {
        let router = Router::new(Arc::new(IdentityCache::new()));
        let client = RecordingClient::new(addr("alice"));
        router.load_client(client.clone()).unwrap();
        let err = router.load_client(client).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyLoaded(_)));
    }

    #[test]
    fn connect_obtains_or_creates_connection_through_jack() {
        let router = Router::new(Arc::new(IdentityCache::new()));
        let jack = Arc::new(CountingJack {
            addrtype: "tcp",
            opens: AtomicUsize::new(0),
        });
        router.load_jack(jack.clone()).unwrap();

        let remote = Address::new("tcp", JsonValue::array([JsonValue::string("10.0.0.1")]), None);
        let first = router.connect(&remote).unwrap();
        let second = router.connect(&remote).unwrap();
        assert_eq!(jack.opens.load(Ordering::SeqCst), 1);
        assert_eq!(first.remote().export().unwrap(), second.remote().export().unwrap());
    }

    #[test]
    fn a_panicking_client_does_not_tear_down_the_router() {
        let recipient_addr = addr("bob");
        let identities = cache_with("bob", &recipient_addr);
        let router = Router::new(identities);
        router
            .load_client(Arc::new(PanickingClient {
                address: recipient_addr.clone(),
            }))
            .unwrap();

        let frame = ejtp_proto::frame::make_encrypted(&recipient_addr, b"ciphertext").unwrap();
        assert!(router.recv_frame(frame).is_ok());
    }
}
