//! `SignedFrame` (`'s'`, `SenderCategory`): header names the sender, body is
//! a 16-bit big-endian signature length, the signature, then the plaintext.

use crate::address::Address;
use crate::error::ProtoError;
use crate::frame::{Category, Decoded, Frame, IdentityLookup};
use crate::registry::FrameCodec;

/// Codec for the `'s'` frame kind.
pub struct SignedFrameCodec;

impl FrameCodec for SignedFrameCodec {
    fn type_byte(&self) -> u8 {
        b's'
    }

    fn category(&self) -> Category {
        Category::Sender
    }

    fn decode(
        &self,
        header: &[u8],
        body: &[u8],
        lookup: Option<&dyn IdentityLookup>,
    ) -> Result<Decoded, ProtoError> {
        let address = header_address(header)?;
        if body.len() < 2 {
            return Err(ProtoError::MalformedFrame(
                "signed frame body shorter than length prefix".to_owned(),
            ));
        }
        let siglen = usize::from(body[0]) * 256 + usize::from(body[1]);
        if body.len() < 2 + siglen {
            return Err(ProtoError::MalformedFrame(format!(
                "signature length {siglen} runs past body of {} bytes",
                body.len() - 2
            )));
        }
        let signature = &body[2..2 + siglen];
        let content = &body[2 + siglen..];
        let lookup = lookup.ok_or_else(|| ProtoError::NoIdentity(address.to_string()))?;
        lookup
            .verify_signature(&address, signature, content)
            .map_err(|_| ProtoError::BadSignature)?;
        Ok(Decoded::Frame(content.to_vec()))
    }
}

fn header_address(header: &[u8]) -> Result<Address, ProtoError> {
    let value = crate::json::parse(header)?;
    Address::create(&value)
}

/// Build a `SignedFrame` attributed to `sender`, wrapping `content` with an
/// already-produced `signature` over it.
pub fn construct(sender: &Address, signature: &[u8], content: &[u8]) -> Result<Frame, ProtoError> {
    let siglen = signature.len();
    if siglen >= 1 << 16 {
        return Err(ProtoError::SignatureTooLong(siglen));
    }
    let mut bytes = vec![b's'];
    bytes.extend(sender.export()?.into_bytes());
    bytes.push(0);
    bytes.push((siglen >> 8) as u8);
    bytes.push((siglen & 0xff) as u8);
    bytes.extend_from_slice(signature);
    bytes.extend_from_slice(content);
    Frame::new(bytes, Vec::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::json::JsonValue;

    struct FixedLookup {
        valid_signature: Vec<u8>,
    }
    impl IdentityLookup for FixedLookup {
        fn decrypt(&self, _address: &Address, ciphertext: &[u8]) -> Result<Vec<u8>, ProtoError> {
            Ok(ciphertext.to_vec())
        }
        fn verify_signature(
            &self,
            _address: &Address,
            signature: &[u8],
            _content: &[u8],
        ) -> Result<(), ProtoError> {
            if signature == self.valid_signature {
                Ok(())
            } else {
                Err(ProtoError::BadSignature)
            }
        }
    }

    fn sender() -> Address {
        Address::new("local", JsonValue::Null, Some(JsonValue::string("alice")))
    }

    #[test]
    fn construct_layout_matches_header_siglen_sig_content() {
        let addr = sender();
        let frame = construct(&addr, b"sig", b"foo").unwrap();
        assert_eq!(frame.type_byte(), b's');
        assert_eq!(frame.header(), addr.export().unwrap().as_bytes());
        assert_eq!(frame.body(), [&[0u8, 3][..], b"sig", b"foo"].concat());
    }

    #[test]
    fn decode_returns_content_when_signature_valid() {
        let addr = sender();
        let frame = construct(&addr, b"sig", b"foo").unwrap();
        let lookup = FixedLookup {
            valid_signature: b"sig".to_vec(),
        };
        let Decoded::Frame(content) = frame.decode(Some(&lookup)).unwrap() else {
            panic!("expected frame bytes");
        };
        assert_eq!(content, b"foo");
    }

    #[test]
    fn decode_fails_when_signature_bytes_flip() {
        let addr = sender();
        let frame = construct(&addr, b"sig", b"foo").unwrap();
        let lookup = FixedLookup {
            valid_signature: b"xig".to_vec(),
        };
        assert!(matches!(
            frame.decode(Some(&lookup)).unwrap_err(),
            ProtoError::BadSignature
        ));
    }

    struct ContentBoundLookup {
        expected_content: Vec<u8>,
    }
    impl IdentityLookup for ContentBoundLookup {
        fn decrypt(&self, _address: &Address, ciphertext: &[u8]) -> Result<Vec<u8>, ProtoError> {
            Ok(ciphertext.to_vec())
        }
        fn verify_signature(
            &self,
            _address: &Address,
            _signature: &[u8],
            content: &[u8],
        ) -> Result<(), ProtoError> {
            if content == self.expected_content {
                Ok(())
            } else {
                Err(ProtoError::BadSignature)
            }
        }
    }

    #[test]
    fn decode_fails_when_content_bytes_flip() {
        let addr = sender();
        let frame = construct(&addr, b"sig", b"bar").unwrap();
        let lookup = ContentBoundLookup {
            expected_content: b"foo".to_vec(),
        };
        assert!(matches!(
            frame.decode(Some(&lookup)).unwrap_err(),
            ProtoError::BadSignature
        ));
    }

    #[test]
    fn construct_rejects_oversize_signature() {
        let addr = sender();
        let huge_sig = vec![0u8; 1 << 16];
        assert!(matches!(
            construct(&addr, &huge_sig, b"foo").unwrap_err(),
            ProtoError::SignatureTooLong(_)
        ));
    }
}
