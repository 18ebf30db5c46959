//! TCP stream jack: an accept loop spawning one [`StreamConnection`] per
//! inbound peer, plus on-demand outbound dialing keyed by the remote
//! address's string form. Each connection performs its own length-prefixed
//! reframing on its read side.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ejtp_core::{Connection, CoreError, Jack, Router};
use ejtp_proto::{Address, Frame, JsonValue};

use crate::datagram::host_port;
use crate::error::TransportError;
use crate::framing::{wrap_frame, Framer, FramingError};
use crate::readiness::Readiness;

const READ_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// A bound TCP listener. Its accept loop adopts inbound peers into the
/// connection table; `route`/`open_connection` dial outbound ones lazily,
/// redialing if a cached entry has since closed.
pub struct StreamJack {
    addrtype: String,
    listener: TcpListener,
    router: Arc<Router>,
    readiness: Arc<Readiness>,
    connections: Mutex<HashMap<String, Arc<StreamConnection>>>,
    accept_worker: Mutex<Option<JoinHandle<()>>>,
}

impl StreamJack {
    /// Bind a TCP listener at `host:port` and start its accept loop.
    pub fn bind(addrtype: impl Into<String>, host: &str, port: u16, router: Arc<Router>) -> Result<Arc<Self>, TransportError> {
        let addrtype = addrtype.into();
        let listener = TcpListener::bind((host, port))?;
        listener.set_nonblocking(true)?;
        let accept_listener = listener.try_clone()?;

        let readiness = Arc::new(Readiness::new());
        readiness.mark_init_done();

        let jack = Arc::new(Self {
            addrtype,
            listener,
            router: Arc::clone(&router),
            readiness: Arc::clone(&readiness),
            connections: Mutex::new(HashMap::new()),
            accept_worker: Mutex::new(None),
        });

        let accept_jack = Arc::clone(&jack);
        let handle = thread::Builder::new()
            .name(format!("ejtp-tcp-accept-{}", jack.addrtype))
            .spawn(move || accept_loop(accept_listener, accept_jack))
            .map_err(TransportError::Io)?;
        *jack.lock_accept_worker() = Some(handle);
        readiness.mark_ready_to_route();

        Ok(jack)
    }

    /// The address this jack's listener is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    fn lock_connections(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<StreamConnection>>> {
        #[allow(clippy::expect_used, reason = "connection table mutex is never held across a panic")]
        self.connections.lock().expect("stream jack connection table mutex poisoned")
    }

    fn lock_accept_worker(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        #[allow(clippy::expect_used, reason = "accept worker mutex is never held across a panic")]
        self.accept_worker.lock().expect("stream jack accept worker mutex poisoned")
    }

    /// Return the connection to `remote`, dialing one if none is cached or
    /// the cached one has since closed.
    fn connection_for(&self, remote: &Address) -> Result<Arc<StreamConnection>, TransportError> {
        let key = remote.export()?;
        if let Some(existing) = self.lock_connections().get(&key).cloned() {
            if !existing.is_closed() {
                return Ok(existing);
            }
        }
        let (host, port) = host_port(remote)?;
        let stream = TcpStream::connect((host.as_str(), port))?;
        let connection = StreamConnection::spawn(stream, remote.clone(), Arc::clone(&self.router))?;
        self.lock_connections().insert(key, Arc::clone(&connection));
        Ok(connection)
    }
}

fn accept_loop(listener: TcpListener, jack: Arc<StreamJack>) {
    loop {
        if jack.readiness.is_closed() {
            return;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let remote = Address::new(
                    jack.addrtype.clone(),
                    JsonValue::array([JsonValue::string(peer.ip().to_string()), JsonValue::Int(i64::from(peer.port()))]),
                    None,
                );
                match StreamConnection::spawn(stream, remote.clone(), Arc::clone(&jack.router)) {
                    Ok(connection) => {
                        if let Ok(key) = remote.export() {
                            jack.lock_connections().insert(key, connection);
                        }
                    }
                    Err(error) => tracing::warn!(%peer, %error, "failed to adopt inbound stream connection"),
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(READ_TIMEOUT);
            }
            Err(error) => {
                tracing::warn!(%error, "stream accept loop stopping on socket error");
                return;
            }
        }
    }
}

impl Jack for StreamJack {
    fn addrtype(&self) -> &str {
        &self.addrtype
    }

    fn bind_details(&self) -> Option<JsonValue> {
        None
    }

    fn route(&self, frame: &Frame) -> Result<(), CoreError> {
        let address = frame.address().map_err(CoreError::from)?;
        let connection = self.connection_for(&address).map_err(CoreError::from)?;
        connection.send(frame)
    }

    fn open_connection(&self, remote: &Address) -> Result<Arc<dyn Connection>, CoreError> {
        self.connection_for(remote).map(|c| c as Arc<dyn Connection>).map_err(CoreError::from)
    }

    fn close(&self) -> Result<(), CoreError> {
        self.readiness.mark_closed_and_cleaned();
        if let Some(handle) = self.lock_accept_worker().take() {
            let _ = handle.join();
        }
        for (_, connection) in self.lock_connections().drain() {
            connection.close();
        }
        Ok(())
    }
}

/// A per-peer TCP session: a write half guarded by a mutex, plus a detached
/// read thread that reframes inbound bytes and hands each decoded frame to
/// the router.
pub struct StreamConnection {
    remote: Address,
    writer: Mutex<TcpStream>,
    closed: AtomicBool,
}

impl StreamConnection {
    fn spawn(stream: TcpStream, remote: Address, router: Arc<Router>) -> Result<Arc<Self>, TransportError> {
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        let read_stream = stream.try_clone()?;

        let connection = Arc::new(Self {
            remote: remote.clone(),
            writer: Mutex::new(stream),
            closed: AtomicBool::new(false),
        });

        let read_connection = Arc::clone(&connection);
        thread::Builder::new()
            .name(format!("ejtp-tcp-read-{remote}"))
            .spawn(move || read_loop(read_stream, router, read_connection))
            .map_err(TransportError::Io)?;

        Ok(connection)
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, TcpStream> {
        #[allow(clippy::expect_used, reason = "writer mutex is never held across a panic")]
        self.writer.lock().expect("stream connection writer mutex poisoned")
    }

    /// `true` once this connection has stopped reading and writing.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn read_loop(mut stream: TcpStream, router: Arc<Router>, connection: Arc<StreamConnection>) {
    let mut framer = Framer::new(MAX_FRAME_LEN);
    let mut buf = [0u8; 8192];
    loop {
        if connection.is_closed() {
            return;
        }
        match stream.read(&mut buf) {
            Ok(0) => {
                tracing::debug!(remote = %connection.remote, "peer closed stream connection");
                connection.close();
                return;
            }
            Ok(n) => match framer.feed(&buf[..n]) {
                Ok(frames) => {
                    for frame_bytes in frames {
                        if let Err(error) = router.recv(&frame_bytes) {
                            tracing::warn!(%error, "router rejected a reframed stream payload");
                        }
                    }
                }
                Err(FramingError::Oversize(size, max)) => {
                    tracing::warn!(size, max, remote = %connection.remote, "oversize frame on stream connection; closing");
                    connection.close();
                    return;
                }
            },
            Err(error) if is_timeout(&error) => continue,
            Err(error) => {
                tracing::debug!(%error, remote = %connection.remote, "stream read loop stopping on socket error");
                connection.close();
                return;
            }
        }
    }
}

fn is_timeout(error: &std::io::Error) -> bool {
    matches!(error.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

impl Connection for StreamConnection {
    fn remote(&self) -> &Address {
        &self.remote
    }

    fn send(&self, frame: &Frame) -> Result<(), CoreError> {
        if self.is_closed() {
            return Err(CoreError::NotLoaded {
                kind: "connection",
                key: self.remote.to_string(),
            });
        }
        let wrapped = wrap_frame(frame.content());
        self.lock_writer().write_all(&wrapped).map_err(|error| CoreError::from(TransportError::Io(error)))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.lock_writer().shutdown(std::net::Shutdown::Both);
    }
}
