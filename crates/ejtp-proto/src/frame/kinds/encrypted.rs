//! `EncryptedFrame` (`'r'`, `ReceiverCategory`): header names the recipient,
//! body is ciphertext of the inner frame's bytes.

use crate::address::Address;
use crate::error::ProtoError;
use crate::frame::{Category, Decoded, Frame, IdentityLookup};
use crate::registry::FrameCodec;

/// Codec for the `'r'` frame kind.
pub struct EncryptedFrameCodec;

impl FrameCodec for EncryptedFrameCodec {
    fn type_byte(&self) -> u8 {
        b'r'
    }

    fn category(&self) -> Category {
        Category::Receiver
    }

    fn decode(
        &self,
        header: &[u8],
        body: &[u8],
        lookup: Option<&dyn IdentityLookup>,
    ) -> Result<Decoded, ProtoError> {
        let address = header_address(header)?;
        let lookup = lookup.ok_or_else(|| ProtoError::NoIdentity(address.to_string()))?;
        let plaintext = lookup.decrypt(&address, body)?;
        Ok(Decoded::Frame(plaintext))
    }
}

fn header_address(header: &[u8]) -> Result<Address, ProtoError> {
    let value = crate::json::parse(header)?;
    Address::create(&value)
}

/// Build an `EncryptedFrame` addressed to `recipient`, wrapping
/// already-encrypted `ciphertext`.
pub fn construct(recipient: &Address, ciphertext: &[u8]) -> Result<Frame, ProtoError> {
    let mut bytes = vec![b'r'];
    bytes.extend(recipient.export()?.into_bytes());
    bytes.push(0);
    bytes.extend_from_slice(ciphertext);
    Frame::new(bytes, Vec::new())
}
