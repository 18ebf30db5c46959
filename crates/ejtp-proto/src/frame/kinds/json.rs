//! `JSONFrame` (`'j'`): the terminal kind carrying a canonical-JSON payload.

use crate::error::ProtoError;
use crate::frame::{Category, Decoded, Frame, IdentityLookup};
use crate::json::{strict_encode, JsonValue};
use crate::registry::FrameCodec;

/// Codec for the `'j'` frame kind. Empty header; body is canonical JSON
/// UTF-8 bytes.
pub struct JsonFrameCodec;

impl FrameCodec for JsonFrameCodec {
    fn type_byte(&self) -> u8 {
        b'j'
    }

    fn category(&self) -> Category {
        Category::None
    }

    fn decode(
        &self,
        _header: &[u8],
        body: &[u8],
        _lookup: Option<&dyn IdentityLookup>,
    ) -> Result<Decoded, ProtoError> {
        let text = String::from_utf8(body.to_vec())
            .map_err(|e| ProtoError::MalformedFrame(e.to_string()))?;
        Ok(Decoded::Text(text))
    }
}

/// Build a `JSONFrame` carrying the canonical JSON encoding of `value`.
pub fn construct(value: &JsonValue) -> Result<Frame, ProtoError> {
    let mut bytes = vec![b'j', 0];
    bytes.extend(strict_encode(value)?);
    Frame::new(bytes, Vec::new())
}
