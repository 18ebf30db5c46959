//! UDP datagram jack: one bound socket, one read-loop thread, one send per
//! outbound frame. Datagram jacks don't model connections at all — each
//! inbound packet becomes one `router.recv` call, and there is no per-peer
//! state to keep.

use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ejtp_core::{Connection, CoreError, Jack, Router};
use ejtp_proto::{Address, Frame, JsonValue};

use crate::error::TransportError;
use crate::readiness::Readiness;

const READ_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_DATAGRAM: usize = 65_536;

/// A bound UDP socket serving one `(addrtype, None)` router key.
pub struct DatagramJack {
    addrtype: String,
    socket: UdpSocket,
    readiness: Arc<Readiness>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DatagramJack {
    /// Bind a UDP socket at `host:port` and start its read loop, feeding
    /// decoded datagrams to `router`. Port `0` binds an ephemeral port;
    /// query it back with [`DatagramJack::local_addr`].
    pub fn bind(addrtype: impl Into<String>, host: &str, port: u16, router: Arc<Router>) -> Result<Arc<Self>, TransportError> {
        let addrtype = addrtype.into();
        let socket = UdpSocket::bind((host, port))?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let read_socket = socket.try_clone()?;

        let readiness = Arc::new(Readiness::new());
        readiness.mark_init_done();

        let jack = Arc::new(Self {
            addrtype,
            socket,
            readiness: Arc::clone(&readiness),
            worker: Mutex::new(None),
        });

        let thread_readiness = Arc::clone(&readiness);
        let handle = thread::Builder::new()
            .name(format!("ejtp-udp-{}", jack.addrtype))
            .spawn(move || read_loop(read_socket, router, thread_readiness))
            .map_err(TransportError::Io)?;
        *jack.lock_worker() = Some(handle);
        readiness.mark_ready_to_route();

        Ok(jack)
    }

    /// The address this jack's socket is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        #[allow(clippy::expect_used, reason = "worker handle mutex is never held across a panic")]
        self.worker.lock().expect("datagram jack worker mutex poisoned")
    }
}

fn read_loop(socket: UdpSocket, router: Arc<Router>, readiness: Arc<Readiness>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        if readiness.is_closed() {
            return;
        }
        match socket.recv_from(&mut buf) {
            Ok((len, peer)) => {
                if let Err(error) = router.recv(&buf[..len]) {
                    tracing::warn!(%peer, %error, "router rejected an inbound datagram");
                }
            }
            Err(error) if is_timeout(&error) => continue,
            Err(error) => {
                tracing::warn!(%error, "datagram read loop stopping on socket error");
                return;
            }
        }
    }
}

fn is_timeout(error: &std::io::Error) -> bool {
    matches!(error.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

impl Jack for DatagramJack {
    fn addrtype(&self) -> &str {
        &self.addrtype
    }

    fn bind_details(&self) -> Option<JsonValue> {
        None
    }

    fn route(&self, frame: &Frame) -> Result<(), CoreError> {
        if !self.readiness.wait_ready_to_route() {
            return Err(CoreError::NotLoaded {
                kind: "jack",
                key: self.addrtype.clone(),
            });
        }
        let address = frame.address().map_err(CoreError::from)?;
        let (host, port) = host_port(&address).map_err(CoreError::from)?;
        self.socket
            .send_to(frame.content(), (host.as_str(), port))
            .map_err(|error| CoreError::from(TransportError::Io(error)))?;
        Ok(())
    }

    fn open_connection(&self, _remote: &Address) -> Result<Arc<dyn Connection>, CoreError> {
        Err(CoreError::NotLoaded {
            kind: "connection",
            key: "datagram jacks do not model connections".to_owned(),
        })
    }

    fn close(&self) -> Result<(), CoreError> {
        self.readiness.mark_closed_and_cleaned();
        if let Some(handle) = self.lock_worker().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

/// Extract `(host, port)` from an address's `[host, port]` transport
/// details, shared by the UDP and TCP jacks.
pub(crate) fn host_port(address: &Address) -> Result<(String, u16), TransportError> {
    let JsonValue::Array(items) = address.addrdetails() else {
        return Err(TransportError::InvalidAddress("expected [host, port] transport details".to_owned()));
    };
    let [JsonValue::String(host), port] = items.as_slice() else {
        return Err(TransportError::InvalidAddress("expected [host, port] transport details".to_owned()));
    };
    let port = match port {
        JsonValue::Int(p) => u16::try_from(*p).map_err(|_| TransportError::InvalidAddress(format!("port {p} out of range")))?,
        other => return Err(TransportError::InvalidAddress(format!("expected integer port, got {other:?}"))),
    };
    Ok((host.clone(), port))
}
