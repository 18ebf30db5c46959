//! [`Client`]: an in-process endpoint with an address, an identity, and a
//! message callback.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use ejtp_core::{CoreError, Identity, IdentityCache, RoutableClient, Router};
use ejtp_crypto::Prototype;
use ejtp_proto::frame::{make_encrypted, make_json, make_signed, Unpacked};
use ejtp_proto::json::strict_encode;
use ejtp_proto::registry::create_frame;
use ejtp_proto::{Address, Frame, Hasher, IdentityLookup, JsonValue};

use crate::error::ClientError;
use crate::jack_registry;

/// Called with each inbound `JSONFrame`'s value and the [`Client`] it
/// arrived on; `frame.sender()`/`frame.receiver()` recover the ancestor
/// addresses. Invoked on the jack thread that decoded the frame, inside a
/// panic guard — a panicking callback is logged and does not tear down the
/// router.
pub type RcvCallback = Box<dyn Fn(&JsonValue, &Client) + Send + Sync>;

/// An in-process endpoint: an address, a shared or private identity cache,
/// and (optionally) a message callback.
pub struct Client {
    router: Arc<Router>,
    interface: Address,
    identities: Arc<IdentityCache>,
    rcv_callback: Mutex<Option<RcvCallback>>,
}

impl Client {
    /// Register a new client with `router` at `interface_address`.
    ///
    /// Uses `identity_cache` if given, otherwise a fresh private one. If
    /// `make_jack` is set, asks the [`jack_registry`] for a jack serving
    /// `interface_address`'s transport family and loads it into `router`;
    /// addresses with no registered factory (e.g. purely in-process
    /// `"local"` addresses) are unaffected, since delivery to a registered
    /// client never needs a jack.
    pub fn new(
        router: Arc<Router>,
        interface_address: Address,
        identity_cache: Option<Arc<IdentityCache>>,
        make_jack: bool,
    ) -> Result<Arc<Self>, ClientError> {
        let identities = identity_cache.unwrap_or_default();
        let client = Arc::new(Self {
            router: Arc::clone(&router),
            interface: interface_address.clone(),
            identities,
            rcv_callback: Mutex::new(None),
        });

        if make_jack {
            if let Some(result) = jack_registry::create(&interface_address) {
                let jack = result?;
                match router.load_jack(jack) {
                    Ok(()) | Err(CoreError::AlreadyLoaded(_)) => {}
                    Err(error) => return Err(error.into()),
                }
            }
        }

        router.load_client(Arc::clone(&client) as Arc<dyn RoutableClient>)?;
        Ok(client)
    }

    /// This client's own address.
    #[must_use]
    pub fn interface(&self) -> &Address {
        &self.interface
    }

    /// The identity cache this client consults for encryption, signing,
    /// and verification.
    #[must_use]
    pub fn identities(&self) -> &Arc<IdentityCache> {
        &self.identities
    }

    /// Install (or replace) this client's inbound `JSONFrame` callback.
    pub fn set_rcv_callback(&self, callback: RcvCallback) {
        *self.lock_callback() = Some(callback);
    }

    /// Hand a fully-constructed outer frame to the router.
    pub fn send(&self, frame: Frame) -> Result<(), ClientError> {
        self.router.recv_frame(frame)?;
        Ok(())
    }

    /// Hook for routing/forwarding clients to override; the base
    /// implementation just re-sends through the router.
    pub fn relay(&self, frame: Frame) -> Result<(), ClientError> {
        self.send(frame)
    }

    /// Shorthand for `owrite_json(&[addr.clone()], value, wrap_sender)`.
    pub fn write_json(&self, addr: &Address, value: &JsonValue, wrap_sender: bool) -> Result<(), ClientError> {
        self.owrite_json(std::slice::from_ref(addr), value, wrap_sender)
    }

    /// Canonicalize `value` to a `JSONFrame`; optionally wrap it in a
    /// `SignedFrame` under this client's own identity; then, for each
    /// address in `hoplist` from last to first, wrap the accumulated bytes
    /// in an `EncryptedFrame` for that hop — so the first hop ends up as
    /// the outermost layer. Sends the result through the router.
    pub fn owrite_json(&self, hoplist: &[Address], value: &JsonValue, wrap_sender: bool) -> Result<(), ClientError> {
        let json_frame = make_json(value)?;
        let mut bytes = json_frame.content().to_vec();

        if wrap_sender {
            let identity = self.own_identity()?;
            let encryptor = identity.encryptor()?;
            let sig = encryptor.sign(&bytes)?;
            let signed = make_signed(&self.interface, &sig, &bytes)?;
            bytes = signed.content().to_vec();
        }

        for hop in hoplist.iter().rev() {
            let identity = self
                .identities
                .get(hop)?
                .ok_or_else(|| ClientError::NoIdentity(hop.to_string()))?;
            let encryptor = identity.encryptor()?;
            let ciphertext = encryptor.encrypt(&bytes)?;
            let wrapped = make_encrypted(hop, &ciphertext)?;
            bytes = wrapped.content().to_vec();
        }

        let outer = create_frame(Bytes::from(bytes), Vec::new())?;
        self.send(outer)
    }

    /// Sign the SHA-1 hex digest of `value`'s canonical JSON encoding, using
    /// this client's own identity.
    pub fn sign(&self, value: &JsonValue) -> Result<Vec<u8>, ClientError> {
        let digest = Hasher::make(&strict_encode(value)?);
        let identity = self.own_identity()?;
        Ok(identity.encryptor()?.sign(digest.as_bytes())?)
    }

    /// Verify `sig` over the SHA-1 hex digest of `value`'s canonical JSON
    /// encoding, using the identity registered at `signer`.
    pub fn sig_verify(&self, value: &JsonValue, signer: &Address, sig: &[u8]) -> Result<bool, ClientError> {
        let digest = Hasher::make(&strict_encode(value)?);
        let identity = self
            .identities
            .get(signer)?
            .ok_or_else(|| ClientError::NoIdentity(signer.to_string()))?;
        Ok(identity.encryptor()?.sig_verify(digest.as_bytes(), sig)?)
    }

    /// Set the encryptor prototype registered for `addr`. Inserts a dummy,
    /// unnamed identity if none was cached there yet; otherwise preserves
    /// the existing identity's name and replaces only its prototype.
    pub fn encryptor_set(&self, addr: &Address, prototype: Prototype) -> Result<(), ClientError> {
        let name = self
            .identities
            .get(addr)?
            .map_or_else(String::new, |identity| identity.name().to_owned());
        self.identities.put(Identity::new(name, addr.clone(), prototype))?;
        Ok(())
    }

    fn own_identity(&self) -> Result<Identity, ClientError> {
        self.identities
            .get(&self.interface)?
            .ok_or_else(|| ClientError::NoIdentity(self.interface.to_string()))
    }

    fn lock_callback(&self) -> std::sync::MutexGuard<'_, Option<RcvCallback>> {
        #[allow(clippy::expect_used, reason = "callback mutex is never held across a panic")]
        self.rcv_callback.lock().expect("client callback mutex poisoned")
    }

    /// Process an inbound frame per its kind:
    /// - `EncryptedFrame` addressed to this client: unpack (decrypts) and
    ///   reprocess the inner frame; addressed elsewhere: `relay`.
    /// - `SignedFrame`: unpack (verifies) and reprocess.
    /// - `JSONFrame`: deliver to the `rcv_callback`.
    /// - Anything else: [`ClientError::UnexpectedFrame`].
    fn process(&self, frame: Frame) -> Result<(), ClientError> {
        match frame.type_byte() {
            b'r' => {
                let address = frame.address()?;
                if address == self.interface {
                    self.unpack_and_reprocess(&frame)
                } else {
                    self.relay(frame)
                }
            }
            b's' => self.unpack_and_reprocess(&frame),
            b'j' => {
                self.deliver(&frame);
                Ok(())
            }
            other => Err(ClientError::UnexpectedFrame(other)),
        }
    }

    fn unpack_and_reprocess(&self, frame: &Frame) -> Result<(), ClientError> {
        let lookup: &dyn IdentityLookup = self.identities.as_ref();
        match frame.unpack(Some(lookup))? {
            Unpacked::Frame(inner) => self.process(inner),
            Unpacked::Json(_) => Err(ClientError::ExpectedNestedFrame),
        }
    }

    fn deliver(&self, frame: &Frame) {
        let Unpacked::Json(value) = (match frame.unpack(Some(self.identities.as_ref() as &dyn IdentityLookup)) {
            Ok(unpacked) => unpacked,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed JSONFrame");
                return;
            }
        }) else {
            tracing::warn!("JSONFrame unpacked to nested frame bytes instead of JSON");
            return;
        };

        let has_callback = self.lock_callback().is_some();
        if !has_callback {
            tracing::warn!(interface = %self.interface, "no rcv_callback registered; dropping JSONFrame");
            return;
        }

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let guard = self.lock_callback();
            if let Some(callback) = guard.as_ref() {
                callback(&value, self);
            }
        }));
        if outcome.is_err() {
            tracing::warn!(interface = %self.interface, "rcv_callback panicked");
        }
    }
}

impl RoutableClient for Client {
    fn address(&self) -> &Address {
        &self.interface
    }

    fn route(&self, frame: Frame) -> Result<(), CoreError> {
        self.process(frame).map_err(CoreError::from)
    }
}
