//! Process-wide registry mapping a frame's type byte to its codec.
//!
//! Registration of the built-in kinds happens once, lazily, at first use.
//! User kinds may be added at runtime with [`register`]; re-registering an
//! already-taken type byte is rejected rather than silently overwritten.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use bytes::Bytes;

use crate::error::ProtoError;
use crate::frame::{kinds, Category, Decoded, Frame, IdentityLookup};

/// A frame kind's decode behavior, keyed into the registry by
/// [`FrameCodec::type_byte`].
pub trait FrameCodec: Send + Sync {
    /// The single ASCII byte identifying this kind on the wire.
    fn type_byte(&self) -> u8;

    /// The address category this kind belongs to, for ancestor lookup and
    /// router dispatch.
    fn category(&self) -> Category;

    /// Decode a frame's header and body into either nested frame bytes or
    /// terminal JSON text.
    fn decode(
        &self,
        header: &[u8],
        body: &[u8],
        lookup: Option<&dyn IdentityLookup>,
    ) -> Result<Decoded, ProtoError>;
}

type Table = HashMap<u8, Arc<dyn FrameCodec>>;

static REGISTRY: LazyLock<Mutex<Table>> = LazyLock::new(|| {
    let mut table: Table = HashMap::new();
    for codec in kinds::builtins() {
        table.insert(codec.type_byte(), codec);
    }
    Mutex::new(table)
});

#[allow(clippy::expect_used, reason = "registry mutex is never held across a panic")]
fn lock() -> std::sync::MutexGuard<'static, Table> {
    REGISTRY.lock().expect("frame registry mutex poisoned")
}

/// Register a new frame kind. Fails with [`ProtoError::KindAlreadyRegistered`]
/// if `codec.type_byte()` is already taken.
pub fn register(codec: Arc<dyn FrameCodec>) -> Result<(), ProtoError> {
    let mut table = lock();
    if table.contains_key(&codec.type_byte()) {
        return Err(ProtoError::KindAlreadyRegistered(codec.type_byte()));
    }
    table.insert(codec.type_byte(), codec);
    Ok(())
}

/// The category registered for `type_byte`, or [`Category::None`] if the
/// byte is unregistered (ancestor lookup degrades gracefully; construction
/// and decoding reject unknown kinds explicitly via [`create_frame`]).
#[must_use]
pub fn category_of(type_byte: u8) -> Category {
    lock()
        .get(&type_byte)
        .map_or(Category::None, |codec| codec.category())
}

/// Decode `header`/`body` using the codec registered for `type_byte`.
pub fn decode(
    type_byte: u8,
    header: &[u8],
    body: &[u8],
    lookup: Option<&dyn IdentityLookup>,
) -> Result<Decoded, ProtoError> {
    let codec = lock()
        .get(&type_byte)
        .cloned()
        .ok_or(ProtoError::UnknownFrameKind(type_byte))?;
    codec.decode(header, body, lookup)
}

/// Parse the leading type byte of `bytes`, confirm it is registered, and
/// return a [`Frame`] carrying `ancestors`.
pub fn create_frame(bytes: Bytes, ancestors: Vec<Frame>) -> Result<Frame, ProtoError> {
    let type_byte = *bytes
        .first()
        .ok_or_else(|| ProtoError::MalformedFrame("empty frame".to_owned()))?;
    if !lock().contains_key(&type_byte) {
        return Err(ProtoError::UnknownFrameKind(type_byte));
    }
    Frame::new(bytes, ancestors)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_json_kind_is_registered() {
        assert_eq!(category_of(b'j'), Category::None);
    }

    #[test]
    fn builtin_encrypted_kind_is_receiver_category() {
        assert_eq!(category_of(b'r'), Category::Receiver);
    }

    #[test]
    fn builtin_signed_kind_is_sender_category() {
        assert_eq!(category_of(b's'), Category::Sender);
    }

    #[test]
    fn create_frame_rejects_unregistered_type_byte() {
        let err = create_frame(Bytes::from_static(b"\xff\0"), Vec::new()).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownFrameKind(0xff)));
    }
}
