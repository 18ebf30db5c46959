//! Property and seed-scenario tests for the frame codec.
//!
//! 1. **Round-trip**: `unpack` recovers what `make_json`/`make_encrypted`/
//!    `make_signed`/`make_compressed` wrapped, for any identity lookup that
//!    echoes ciphertext and accepts signatures.
//! 2. **Nesting is order-preserving**: wrapping `encrypted(signed(json))`
//!    yields an ancestor chain ordered nearest-first.
//! 3. **Canonical JSON is injective enough for hashing**: reordering object
//!    keys never changes the encoded bytes.
#![allow(clippy::unwrap_used)]

use ejtp_proto::address::Address;
use ejtp_proto::frame::{self, Category, CompressionKind, Unpacked};
use ejtp_proto::{Hasher, IdentityLookup, JsonValue, ProtoError};
use proptest::prelude::*;

struct EchoLookup;

impl IdentityLookup for EchoLookup {
    fn decrypt(&self, _address: &Address, ciphertext: &[u8]) -> Result<Vec<u8>, ProtoError> {
        Ok(ciphertext.to_vec())
    }

    fn verify_signature(
        &self,
        _address: &Address,
        _signature: &[u8],
        _content: &[u8],
    ) -> Result<(), ProtoError> {
        Ok(())
    }
}

fn local(callsign: &str) -> Address {
    Address::new("local", JsonValue::Null, Some(JsonValue::string(callsign)))
}

#[test]
fn seed_s1_json_frame_round_trips_a_string() {
    let frame = frame::make_json(&JsonValue::string("hello")).unwrap();
    let Unpacked::Json(value) = frame.unpack(None).unwrap() else {
        panic!("expected terminal json");
    };
    assert_eq!(value, JsonValue::string("hello"));
}

#[test]
fn seed_s5_encrypted_frame_names_receiver_category() {
    let bob = local("bob");
    let inner = frame::make_json(&JsonValue::string("secret")).unwrap();
    let outer = frame::make_encrypted(&bob, inner.content()).unwrap();
    assert_eq!(outer.category(), Category::Receiver);
    assert_eq!(outer.address().unwrap(), bob);
}

#[test]
fn seed_s7_onion_of_signed_then_encrypted_preserves_ancestor_order() {
    let alice = local("alice");
    let bob = local("bob");
    let inner = frame::make_json(&JsonValue::string("hi")).unwrap();
    let signed = frame::make_signed(&alice, b"sig", inner.content()).unwrap();
    let outer = frame::make_encrypted(&bob, signed.content()).unwrap();

    let lookup = EchoLookup;
    let Unpacked::Frame(unwrapped) = outer.unpack(Some(&lookup)).unwrap() else {
        panic!("expected nested frame");
    };
    assert_eq!(unwrapped.type_byte(), b's');
    assert_eq!(unwrapped.sender(), None);
    assert_eq!(unwrapped.receiver().unwrap(), bob);

    let Unpacked::Json(value) = unwrapped.unpack(Some(&lookup)).unwrap() else {
        panic!("expected terminal json");
    };
    assert_eq!(value, JsonValue::string("hi"));
}

#[test]
fn seed_s8_compressed_json_frame_round_trips() {
    let inner = frame::make_json(&JsonValue::string("zipped")).unwrap();
    let outer = frame::make_compressed(CompressionKind::Zlib, inner.content()).unwrap();
    let Unpacked::Frame(next) = outer.unpack(None).unwrap() else {
        panic!("expected nested frame");
    };
    let Unpacked::Json(value) = next.unpack(None).unwrap() else {
        panic!("expected terminal json");
    };
    assert_eq!(value, JsonValue::string("zipped"));
}

#[test]
fn canonical_json_of_sample_string_hashes_to_known_digest() {
    // S3: SHA-1 of the literal bytes "Sample string".
    assert_eq!(
        Hasher::make(b"Sample string"),
        "e9a47e5417686cf0ac5c8ad9ee90ba2c1d08cc14"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn json_frame_round_trips_any_string(s in "\\PC*") {
        let frame = frame::make_json(&JsonValue::string(s.clone())).unwrap();
        let Unpacked::Json(value) = frame.unpack(None).unwrap() else {
            prop_assert!(false, "expected terminal json");
            return Ok(());
        };
        prop_assert_eq!(value, JsonValue::string(s));
    }

    #[test]
    fn encrypted_frame_round_trips_any_body(body in proptest::collection::vec(any::<u8>(), 0..256)) {
        let recipient = local("bob");
        let frame = frame::make_encrypted(&recipient, &body).unwrap();
        let lookup = EchoLookup;
        let Ok(ejtp_proto::frame::Decoded::Frame(plain)) = frame.decode(Some(&lookup)) else {
            prop_assert!(false, "expected frame bytes");
            return Ok(());
        };
        prop_assert_eq!(plain, body);
    }

    #[test]
    fn signed_frame_round_trips_any_content(content in proptest::collection::vec(any::<u8>(), 0..256)) {
        let sender = local("alice");
        let frame = frame::make_signed(&sender, b"sig", &content).unwrap();
        let lookup = EchoLookup;
        let Ok(ejtp_proto::frame::Decoded::Frame(plain)) = frame.decode(Some(&lookup)) else {
            prop_assert!(false, "expected frame bytes");
            return Ok(());
        };
        prop_assert_eq!(plain, content);
    }

    #[test]
    fn compressed_frame_round_trips_any_body(body in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let frame = frame::make_compressed(CompressionKind::Zlib, &body).unwrap();
        let Ok(ejtp_proto::frame::Decoded::Frame(out)) = frame.decode(None) else {
            prop_assert!(false, "expected frame bytes");
            return Ok(());
        };
        prop_assert_eq!(out, body);
    }

    #[test]
    fn address_string_form_round_trips_through_parse(callsign in "[a-z]{1,12}") {
        let addr = local(&callsign);
        let text = addr.export().unwrap();
        let parsed = Address::parse(&text).unwrap();
        prop_assert_eq!(addr, parsed);
    }
}
