//! An [`Identity`]: a name, a location, and an encryptor prototype.
//!
//! The JSON form of an encryptor prototype is a tagged list, `[kind,
//! ...args]`; binary key material inside it is hex-encoded, per the
//! convention the frame layer uses for its own byte fields. `ejtp-crypto`
//! itself has no JSON dependency, so the conversions below are the seam
//! where [`ejtp_crypto::Prototype`] meets [`JsonValue`].

use ejtp_crypto::Prototype;
use ejtp_proto::{Address, JsonValue};

use crate::error::CoreError;

/// A name, a location, and a cryptographic prototype — the unit of record
/// an [`crate::IdentityCache`] stores.
#[derive(Debug, Clone)]
pub struct Identity {
    name: String,
    location: Address,
    prototype: Prototype,
    /// Extra keys carried through a cache file's JSON round-trip verbatim,
    /// even though this crate never interprets them.
    extra: Vec<(String, JsonValue)>,
}

impl Identity {
    /// Build an identity directly, with no extension fields.
    #[must_use]
    pub fn new(name: impl Into<String>, location: Address, prototype: Prototype) -> Self {
        Self {
            name: name.into(),
            location,
            prototype,
            extra: Vec::new(),
        }
    }

    /// Build an identity carrying extension fields preserved from a cache
    /// file's JSON object.
    #[must_use]
    pub fn with_extra(
        name: impl Into<String>,
        location: Address,
        prototype: Prototype,
        extra: Vec<(String, JsonValue)>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            prototype,
            extra,
        }
    }

    /// The identity's display name. Not required to be unique.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address this identity is addressed by.
    #[must_use]
    pub fn location(&self) -> &Address {
        &self.location
    }

    /// The encryptor prototype this identity's key material describes.
    #[must_use]
    pub fn prototype(&self) -> &Prototype {
        &self.prototype
    }

    /// The cache key this identity is filed under: the string form of
    /// [`Identity::location`].
    pub fn key(&self) -> Result<String, CoreError> {
        Ok(self.location.export()?)
    }

    /// Build a live encryptor from [`Identity::prototype`].
    pub fn encryptor(&self) -> Result<std::sync::Arc<dyn ejtp_crypto::Encryptor>, CoreError> {
        Ok(ejtp_crypto::make(&self.prototype)?)
    }

    /// Render this identity as its cache-file JSON object, with `name`,
    /// `location`, and `encryptor` plus any preserved extension fields.
    pub fn to_json(&self) -> Result<JsonValue, CoreError> {
        let mut pairs = vec![
            ("name".to_owned(), JsonValue::string(self.name.clone())),
            ("location".to_owned(), self.location.to_structured()),
            ("encryptor".to_owned(), prototype_to_json(&self.prototype)),
        ];
        pairs.extend(self.extra.iter().cloned());
        Ok(JsonValue::Object(pairs.into_iter().collect()))
    }

    /// Parse an identity from its cache-file JSON object.
    pub fn from_json(value: &JsonValue) -> Result<Self, CoreError> {
        let JsonValue::Object(map) = value else {
            return Err(CoreError::MalformedPrototype(
                "identity record must be a JSON object".to_owned(),
            ));
        };
        let name = match map.get("name") {
            Some(JsonValue::String(s)) => s.clone(),
            _ => {
                return Err(CoreError::MalformedPrototype(
                    "identity record missing string \"name\"".to_owned(),
                ))
            }
        };
        let location_value = map.get("location").ok_or_else(|| {
            CoreError::MalformedPrototype("identity record missing \"location\"".to_owned())
        })?;
        let location = Address::create(location_value)?;
        let encryptor_value = map.get("encryptor").ok_or_else(|| {
            CoreError::MalformedPrototype("identity record missing \"encryptor\"".to_owned())
        })?;
        let prototype = prototype_from_json(encryptor_value)?;
        let extra = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "name" | "location" | "encryptor"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self::with_extra(name, location, prototype, extra))
    }
}

/// Render a [`Prototype`] as its JSON list form `[kind, ...args]`.
#[must_use]
pub fn prototype_to_json(prototype: &Prototype) -> JsonValue {
    match prototype {
        Prototype::Rotate { shift } => JsonValue::array([JsonValue::string("rotate"), JsonValue::Int(i64::from(*shift))]),
        Prototype::Aes { key } => JsonValue::array([JsonValue::string("aes"), JsonValue::string(hex_encode(key))]),
        Prototype::Rsa {
            public_der,
            private_der,
        } => JsonValue::array([
            JsonValue::string("rsa"),
            opt_hex(private_der.as_deref()),
            opt_hex(public_der.as_deref()),
        ]),
        Prototype::Ecc {
            public,
            private,
            curve,
        } => JsonValue::array([
            JsonValue::string("ecc"),
            JsonValue::string(curve.clone()),
            opt_hex(public.as_ref().map(|p| p.as_slice())),
            opt_hex(private.as_ref().map(|p| p.as_slice())),
        ]),
    }
}

/// Parse a [`Prototype`] from its JSON list form.
pub fn prototype_from_json(value: &JsonValue) -> Result<Prototype, CoreError> {
    let JsonValue::Array(items) = value else {
        return Err(CoreError::MalformedPrototype(
            "encryptor prototype must be a JSON array".to_owned(),
        ));
    };
    let kind = match items.first() {
        Some(JsonValue::String(s)) => s.as_str(),
        _ => {
            return Err(CoreError::MalformedPrototype(
                "encryptor prototype missing string kind tag".to_owned(),
            ))
        }
    };
    match kind {
        "rotate" => {
            let shift = match items.get(1) {
                Some(JsonValue::Int(i)) => i32::try_from(*i).map_err(|_| {
                    CoreError::MalformedPrototype("rotate shift out of range".to_owned())
                })?,
                _ => {
                    return Err(CoreError::MalformedPrototype(
                        "rotate prototype missing integer shift".to_owned(),
                    ))
                }
            };
            Ok(Prototype::Rotate { shift })
        }
        "aes" => {
            let key_hex = match items.get(1) {
                Some(JsonValue::String(s)) => s,
                _ => {
                    return Err(CoreError::MalformedPrototype(
                        "aes prototype missing key string".to_owned(),
                    ))
                }
            };
            Ok(Prototype::Aes {
                key: hex_decode(key_hex)?,
            })
        }
        "rsa" => {
            let private_der = opt_hex_field(items.get(1))?;
            let public_der = opt_hex_field(items.get(2))?;
            Ok(Prototype::Rsa {
                public_der,
                private_der,
            })
        }
        "ecc" => {
            let curve = match items.get(1) {
                Some(JsonValue::String(s)) => s.clone(),
                _ => {
                    return Err(CoreError::MalformedPrototype(
                        "ecc prototype missing curve name".to_owned(),
                    ))
                }
            };
            let public = opt_hex_array(items.get(2))?;
            let private = opt_hex_array(items.get(3))?;
            Ok(Prototype::Ecc {
                public,
                private,
                curve,
            })
        }
        other => Err(CoreError::MalformedPrototype(format!(
            "unrecognized encryptor kind {other:?}"
        ))),
    }
}

fn opt_hex(bytes: Option<&[u8]>) -> JsonValue {
    bytes.map_or(JsonValue::Null, |b| JsonValue::string(hex_encode(b)))
}

fn opt_hex_field(value: Option<&JsonValue>) -> Result<Option<Vec<u8>>, CoreError> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(hex_decode(s)?)),
        Some(_) => Err(CoreError::MalformedPrototype(
            "expected hex string or null".to_owned(),
        )),
    }
}

fn opt_hex_array(value: Option<&JsonValue>) -> Result<Option<[u8; 32]>, CoreError> {
    match opt_hex_field(value)? {
        None => Ok(None),
        Some(bytes) => {
            let arr: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
                CoreError::MalformedPrototype(format!(
                    "expected 32-byte key, got {} bytes",
                    bytes.len()
                ))
            })?;
            Ok(Some(arr))
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn hex_decode(s: &str) -> Result<Vec<u8>, CoreError> {
    if s.len() % 2 != 0 {
        return Err(CoreError::MalformedPrototype(
            "hex string has odd length".to_owned(),
        ));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| CoreError::MalformedPrototype(format!("invalid hex byte: {e}")))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_identity() -> Identity {
        Identity::new(
            "alice",
            Address::new("local", JsonValue::Null, Some(JsonValue::string("alice"))),
            Prototype::Rotate { shift: 4 },
        )
    }

    #[test]
    fn round_trips_through_json() {
        let identity = sample_identity();
        let value = identity.to_json().unwrap();
        let restored = Identity::from_json(&value).unwrap();
        assert_eq!(restored.name(), "alice");
        assert_eq!(restored.prototype(), &Prototype::Rotate { shift: 4 });
        assert_eq!(restored.key().unwrap(), identity.key().unwrap());
    }

    #[test]
    fn preserves_extra_fields_through_round_trip() {
        let value = JsonValue::Object(
            [
                ("name".to_owned(), JsonValue::string("bob")),
                (
                    "location".to_owned(),
                    JsonValue::array([JsonValue::string("local"), JsonValue::Null]),
                ),
                (
                    "encryptor".to_owned(),
                    JsonValue::array([JsonValue::string("rotate"), JsonValue::Int(1)]),
                ),
                ("note".to_owned(), JsonValue::string("hand-rolled test fixture")),
            ]
            .into_iter()
            .collect(),
        );
        let identity = Identity::from_json(&value).unwrap();
        let rendered = identity.to_json().unwrap();
        let JsonValue::Object(map) = rendered else {
            panic!("expected object");
        };
        assert_eq!(
            map.get("note"),
            Some(&JsonValue::string("hand-rolled test fixture"))
        );
    }

    #[test]
    fn aes_prototype_round_trips_key_bytes() {
        let identity = Identity::new(
            "carol",
            Address::new("local", JsonValue::Null, Some(JsonValue::string("carol"))),
            Prototype::Aes { key: vec![0xAB; 32] },
        );
        let value = identity.to_json().unwrap();
        let restored = Identity::from_json(&value).unwrap();
        assert_eq!(restored.prototype(), &Prototype::Aes { key: vec![0xAB; 32] });
    }

    #[test]
    fn rejects_unrecognized_encryptor_kind() {
        let err = prototype_from_json(&JsonValue::array([JsonValue::string("quantum")])).unwrap_err();
        assert!(matches!(err, CoreError::MalformedPrototype(_)));
    }
}
