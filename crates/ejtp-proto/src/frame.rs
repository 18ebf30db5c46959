//! The self-delimiting frame container and its nesting/ancestor semantics.
//!
//! On the wire a frame is `TYPE_BYTE ++ HEADER_BYTES ++ 0x00 ++ BODY_BYTES`.
//! `BODY_BYTES` may itself be another serialized frame, which is how
//! encryption layers, signatures, and compression nest around an innermost
//! [`kinds::json`] payload.

use bytes::Bytes;

use crate::address::Address;
use crate::error::ProtoError;
use crate::json::{self, JsonValue};
use crate::registry;

pub mod kinds;

/// The category a frame kind belongs to, used for ancestor lookup and
/// router dispatch. Mirrors the source's category marker classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Frame carries no address-bearing category (JSON, compressed).
    None,
    /// Frame header names a sender address (`SignedFrame`).
    Sender,
    /// Frame header names a receiver address (`EncryptedFrame`).
    Receiver,
}

/// What `decode` produced: either more frame bytes to re-parse, or terminal
/// JSON text.
#[derive(Debug, Clone)]
pub enum Decoded {
    /// Another frame's on-wire bytes, to be re-parsed with this frame
    /// prepended to its ancestor chain.
    Frame(Vec<u8>),
    /// Terminal canonical-JSON text (from a `JSONFrame`).
    Text(String),
}

/// What `unpack` produced: either the next frame layer in, or the JSON value
/// carried by a terminal `JSONFrame`.
#[derive(Debug, Clone)]
pub enum Unpacked {
    /// One layer further in.
    Frame(Frame),
    /// The terminal JSON payload.
    Json(JsonValue),
}

/// Seam that lets `EncryptedFrame`/`SignedFrame` decode without this crate
/// knowing about identities or encryptors. Implemented downstream by
/// `ejtp-core`'s `IdentityCache`.
pub trait IdentityLookup: Send + Sync {
    /// Decrypt `ciphertext` using the encryptor registered at `address`.
    fn decrypt(&self, address: &Address, ciphertext: &[u8]) -> Result<Vec<u8>, ProtoError>;

    /// Verify `signature` over `content` using the encryptor registered at
    /// `address`. Returns `Ok(())` iff the signature is valid.
    fn verify_signature(
        &self,
        address: &Address,
        signature: &[u8],
        content: &[u8],
    ) -> Result<(), ProtoError>;
}

/// An immutable, self-delimiting byte container plus the chain of frames it
/// was cropped out of.
///
/// Ancestors are stored nearest-first: if frame A contains B contains C,
/// then `C.ancestors() == [B.crop(), A.crop()]`. `crop()`'d ancestors retain
/// only their header, never their body or their own ancestor list, which is
/// what keeps the chain acyclic and bounded.
#[derive(Debug, Clone)]
pub struct Frame {
    content: Bytes,
    ancestors: Vec<Frame>,
}

impl Frame {
    /// Construct a frame from raw on-wire bytes and an optional ancestor
    /// chain, validating that a header-terminating NUL byte exists.
    pub fn new(content: impl Into<Bytes>, ancestors: Vec<Frame>) -> Result<Self, ProtoError> {
        let content = content.into();
        if content.is_empty() {
            return Err(ProtoError::MalformedFrame("empty frame".to_owned()));
        }
        if !content.contains(&0u8) {
            return Err(ProtoError::MalformedFrame(
                "missing header NUL terminator".to_owned(),
            ));
        }
        Ok(Self { content, ancestors })
    }

    fn nul_index(&self) -> usize {
        // Validated present at construction time.
        self.content
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.content.len())
    }

    /// The leading type byte identifying the frame kind.
    #[must_use]
    pub fn type_byte(&self) -> u8 {
        self.content[0]
    }

    /// Bytes between the type byte and the header-terminating NUL.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.content[1..self.nul_index()]
    }

    /// Bytes after the header-terminating NUL.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.content[self.nul_index() + 1..]
    }

    /// The full on-wire bytes of this frame.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The ancestor chain, nearest container first.
    #[must_use]
    pub fn ancestors(&self) -> &[Frame] {
        &self.ancestors
    }

    /// A header-only copy of this frame, used to extend an inner frame's
    /// ancestor chain without retaining this frame's body or its own
    /// ancestors.
    #[must_use]
    pub fn crop(&self) -> Frame {
        let nul = self.nul_index();
        let mut bytes = Vec::with_capacity(nul + 1);
        bytes.push(self.type_byte());
        bytes.extend_from_slice(self.header());
        bytes.push(0);
        Frame {
            content: Bytes::from(bytes),
            ancestors: Vec::new(),
        }
    }

    /// The frame kind's category, per the registry.
    #[must_use]
    pub fn category(&self) -> Category {
        registry::category_of(self.type_byte())
    }

    /// Decode this frame's body, per its registered kind.
    pub fn decode(&self, lookup: Option<&dyn IdentityLookup>) -> Result<Decoded, ProtoError> {
        registry::decode(self.type_byte(), self.header(), self.body(), lookup)
    }

    /// Recursively decode this frame: if `decode` yields more frame bytes,
    /// re-parse them as a [`Frame`] with `self.crop()` prepended to the
    /// ancestor chain; if `decode` yields canonical-JSON text, parse and
    /// return the value.
    pub fn unpack(&self, lookup: Option<&dyn IdentityLookup>) -> Result<Unpacked, ProtoError> {
        match self.decode(lookup)? {
            Decoded::Frame(bytes) => {
                let mut ancestors = vec![self.crop()];
                ancestors.extend(self.ancestors.iter().cloned());
                let frame = registry::create_frame(Bytes::from(bytes), ancestors)?;
                Ok(Unpacked::Frame(frame))
            }
            Decoded::Text(text) => Ok(Unpacked::Json(json::parse(text.as_bytes())?)),
        }
    }

    /// Returns the nearest ancestor belonging to `category`, scanning the
    /// ancestor chain nearest-first.
    #[must_use]
    pub fn last_category(&self, category: Category) -> Option<&Frame> {
        self.ancestors.iter().find(|a| a.category() == category)
    }

    /// The sender address, derived from the nearest `Sender`-category
    /// ancestor's header, if any.
    #[must_use]
    pub fn sender(&self) -> Option<Address> {
        let ancestor = self.last_category(Category::Sender)?;
        header_address(ancestor).ok()
    }

    /// The receiver address, derived from the nearest `Receiver`-category
    /// ancestor's header, if any.
    #[must_use]
    pub fn receiver(&self) -> Option<Address> {
        let ancestor = self.last_category(Category::Receiver)?;
        header_address(ancestor).ok()
    }

    /// This frame's own address, for frames in the `Sender`/`Receiver`
    /// categories whose header is an address. `None` for categoryless
    /// frames (`JSONFrame`, `CompressedFrame`).
    pub fn address(&self) -> Result<Address, ProtoError> {
        header_address(self)
    }
}

fn header_address(frame: &Frame) -> Result<Address, ProtoError> {
    let value = json::parse(frame.header())?;
    Address::create(&value)
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content && self.ancestors == other.ancestors
    }
}

impl Eq for Frame {}

/// Build a terminal `JSONFrame` carrying the canonical JSON encoding of
/// `value`.
pub fn make_json(value: &JsonValue) -> Result<Frame, ProtoError> {
    kinds::json::construct(value)
}

/// Build an `EncryptedFrame` addressed to `recipient`, wrapping
/// already-encrypted `ciphertext`. The caller (which holds the recipient's
/// `Identity`) is responsible for producing `ciphertext` via
/// `identity.encrypt(inner_bytes)`.
pub fn make_encrypted(recipient: &Address, ciphertext: &[u8]) -> Result<Frame, ProtoError> {
    kinds::encrypted::construct(recipient, ciphertext)
}

/// Build a `SignedFrame` attributed to `sender`, wrapping `content` together
/// with an already-produced `signature` over it. The caller is responsible
/// for producing `signature` via `identity.sign(content)`.
pub fn make_signed(sender: &Address, signature: &[u8], content: &[u8]) -> Result<Frame, ProtoError> {
    kinds::signed::construct(sender, signature, content)
}

/// Compression kind for [`make_compressed`].
pub use kinds::compressed::CompressionKind;

/// Build a `CompressedFrame` wrapping `inner_bytes` compressed with `kind`.
pub fn make_compressed(kind: CompressionKind, inner_bytes: &[u8]) -> Result<Frame, ProtoError> {
    kinds::compressed::construct(kind, inner_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn crop_keeps_only_header() {
        let frame = make_json(&JsonValue::string("hello")).unwrap();
        let cropped = frame.crop();
        assert_eq!(cropped.content(), &[b'j', 0]);
        assert!(cropped.ancestors().is_empty());
    }

    #[test]
    fn new_rejects_missing_nul() {
        assert!(Frame::new(Bytes::from_static(b"j"), Vec::new()).is_err());
    }

    #[test]
    fn header_and_body_split_on_first_nul() {
        let frame = Frame::new(Bytes::from_static(b"shead\0body"), Vec::new()).unwrap();
        assert_eq!(frame.header(), b"head");
        assert_eq!(frame.body(), b"body");
    }
}
