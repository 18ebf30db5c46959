//! `CompressedFrame` (`'c'`, no address category): header is a single byte
//! naming the compressor, body is the compressed bytes of the inner frame.

use std::io::{Read as _, Write as _};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::ProtoError;
use crate::frame::{Category, Decoded, Frame, IdentityLookup};
use crate::registry::FrameCodec;

/// The compressor a [`CompressedFrame`](Frame) names in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// DEFLATE via zlib framing.
    Zlib,
    /// `bzip2` block compression.
    Bzip2,
}

impl CompressionKind {
    fn header_byte(self) -> u8 {
        match self {
            Self::Zlib => b'z',
            Self::Bzip2 => b'b',
        }
    }

    /// Resolve a header byte, or one of its aliases, to a [`CompressionKind`].
    /// Unlike the wire header (a single byte), aliasing also accepts the
    /// full names `zlib`/`gzip`/`bzip`/`bzip2`/`bz2` for configuration
    /// convenience.
    fn from_alias(name: &str) -> Option<Self> {
        match name {
            "z" | "zlib" | "gzip" => Some(Self::Zlib),
            "b" | "bzip" | "bzip2" | "bz2" => Some(Self::Bzip2),
            _ => None,
        }
    }
}

/// Codec for the `'c'` frame kind.
pub struct CompressedFrameCodec;

impl FrameCodec for CompressedFrameCodec {
    fn type_byte(&self) -> u8 {
        b'c'
    }

    fn category(&self) -> Category {
        Category::None
    }

    fn decode(
        &self,
        header: &[u8],
        body: &[u8],
        _lookup: Option<&dyn IdentityLookup>,
    ) -> Result<Decoded, ProtoError> {
        let kind_char = header
            .first()
            .ok_or_else(|| ProtoError::MalformedFrame("compressed frame missing kind byte".to_owned()))?;
        let kind = CompressionKind::from_alias(&(*kind_char as char).to_string())
            .ok_or(ProtoError::UnknownFrameKind(*kind_char))?;
        let inner = decompress(kind, body)?;
        Ok(Decoded::Frame(inner))
    }
}

fn decompress(kind: CompressionKind, body: &[u8]) -> Result<Vec<u8>, ProtoError> {
    let mut out = Vec::new();
    match kind {
        CompressionKind::Zlib => {
            ZlibDecoder::new(body)
                .read_to_end(&mut out)
                .map_err(|e| ProtoError::CompressionError(e.to_string()))?;
        }
        CompressionKind::Bzip2 => {
            bzip2::read::BzDecoder::new(body)
                .read_to_end(&mut out)
                .map_err(|e| ProtoError::CompressionError(e.to_string()))?;
        }
    }
    Ok(out)
}

fn compress(kind: CompressionKind, inner: &[u8]) -> Result<Vec<u8>, ProtoError> {
    match kind {
        CompressionKind::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(inner)
                .map_err(|e| ProtoError::CompressionError(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| ProtoError::CompressionError(e.to_string()))
        }
        CompressionKind::Bzip2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder
                .write_all(inner)
                .map_err(|e| ProtoError::CompressionError(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| ProtoError::CompressionError(e.to_string()))
        }
    }
}

/// Build a `CompressedFrame` wrapping `inner_bytes` (the full bytes of an
/// inner frame) with the given [`CompressionKind`].
pub fn construct(kind: CompressionKind, inner_bytes: &[u8]) -> Result<Frame, ProtoError> {
    let compressed = compress(kind, inner_bytes)?;
    let mut bytes = vec![b'c', kind.header_byte(), 0];
    bytes.extend(compressed);
    Frame::new(bytes, Vec::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zlib_round_trips_through_construct_and_decode() {
        let inner = b"j\0\"hello\"";
        let frame = construct(CompressionKind::Zlib, inner).unwrap();
        assert_eq!(frame.type_byte(), b'c');
        assert_eq!(frame.header(), b"z");
        let Decoded::Frame(bytes) = frame.decode(None).unwrap() else {
            panic!("expected frame bytes");
        };
        assert_eq!(bytes, inner);
    }

    #[test]
    fn bzip2_round_trips_through_construct_and_decode() {
        let inner = b"j\0\"hello\"";
        let frame = construct(CompressionKind::Bzip2, inner).unwrap();
        assert_eq!(frame.header(), b"b");
        let Decoded::Frame(bytes) = frame.decode(None).unwrap() else {
            panic!("expected frame bytes");
        };
        assert_eq!(bytes, inner);
    }

    #[test]
    fn decode_rejects_unknown_compressor_byte() {
        let frame = Frame::new(b"cx\0garbage".to_vec(), Vec::new()).unwrap();
        assert!(matches!(
            frame.decode(None).unwrap_err(),
            ProtoError::UnknownFrameKind(b'x')
        ));
    }

    #[test]
    fn alias_names_resolve_to_same_kind() {
        assert_eq!(CompressionKind::from_alias("gzip"), Some(CompressionKind::Zlib));
        assert_eq!(CompressionKind::from_alias("bz2"), Some(CompressionKind::Bzip2));
        assert_eq!(CompressionKind::from_alias("other"), None);
    }
}
