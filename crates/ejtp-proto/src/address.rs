//! Canonical structured endpoint identifiers.
//!
//! An [`Address`] is a 3-tuple `(addrtype, addrdetails, callsign)`. Its
//! string form is a pure function of its structured form (the canonical
//! JSON encoding of the 3-element array, with a missing callsign rendered as
//! `null`), and routing tables key on that string form.

use std::fmt;

use crate::error::ProtoError;
use crate::json::{self, strict_string, JsonValue};

/// A 3-tuple endpoint identifier: transport family, transport-specific
/// details, and an optional callsign distinguishing endpoints that share a
/// host and transport.
#[derive(Debug, Clone)]
pub struct Address {
    addrtype: String,
    addrdetails: JsonValue,
    callsign: Option<JsonValue>,
}

impl Address {
    /// Build an address directly from its parts, bypassing the length
    /// validation [`Address::create`] performs on untrusted input.
    #[must_use]
    pub fn new(addrtype: impl Into<String>, addrdetails: JsonValue, callsign: Option<JsonValue>) -> Self {
        Self {
            addrtype: addrtype.into(),
            addrdetails,
            callsign,
        }
    }

    /// Create an address from its structured JSON form: a 2- or 3-element
    /// array `[addrtype, addrdetails]` or `[addrtype, addrdetails,
    /// callsign]`. Any other shape, or an element count outside `2..=3`, is
    /// rejected.
    pub fn create(value: &JsonValue) -> Result<Self, ProtoError> {
        let JsonValue::Array(items) = value else {
            return Err(ProtoError::SerializationError(
                "address must be a JSON array".to_owned(),
            ));
        };
        if items.len() < 2 || items.len() > 3 {
            return Err(ProtoError::SerializationError(format!(
                "invalid address format: expected 2 or 3 elements, got {}",
                items.len()
            )));
        }
        let JsonValue::String(addrtype) = &items[0] else {
            return Err(ProtoError::SerializationError(
                "address addrtype must be a string".to_owned(),
            ));
        };
        let addrdetails = items[1].clone();
        let callsign = match items.get(2) {
            Some(JsonValue::Null) | None => None,
            Some(other) => Some(other.clone()),
        };
        Ok(Self {
            addrtype: addrtype.clone(),
            addrdetails,
            callsign,
        })
    }

    /// Parse an address from its JSON-text string form.
    pub fn parse(text: &str) -> Result<Self, ProtoError> {
        let value = json::parse(text.as_bytes())?;
        Self::create(&value)
    }

    /// The transport-family tag, e.g. `"udp4"`, `"tcp"`, `"local"`.
    #[must_use]
    pub fn addrtype(&self) -> &str {
        &self.addrtype
    }

    /// Transport-specific details, e.g. `[ip, port]` for `udp4`/`tcp4`.
    #[must_use]
    pub fn addrdetails(&self) -> &JsonValue {
        &self.addrdetails
    }

    /// The opaque callsign distinguishing endpoints on the same transport,
    /// if one was set.
    #[must_use]
    pub fn callsign(&self) -> Option<&JsonValue> {
        self.callsign.as_ref()
    }

    /// The always-3-element structured form, with a missing callsign
    /// rendered as `null`.
    #[must_use]
    pub fn to_structured(&self) -> JsonValue {
        JsonValue::Array(vec![
            JsonValue::String(self.addrtype.clone()),
            self.addrdetails.clone(),
            self.callsign.clone().unwrap_or(JsonValue::Null),
        ])
    }

    /// The canonical string form: canonical JSON of the structured form.
    /// Routing tables key on this value, and address equality is defined as
    /// equality of string forms.
    pub fn export(&self) -> Result<String, ProtoError> {
        strict_string(&self.to_structured())
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        match (self.export(), other.export()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if let Ok(s) = self.export() {
            s.hash(state);
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.export() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<address addrtype={}>", self.addrtype),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn export_renders_missing_callsign_as_null() {
        let addr = Address::new("local", JsonValue::Null, None);
        assert_eq!(addr.export().unwrap(), r#"["local",null,null]"#);
    }

    #[test]
    fn export_renders_callsign() {
        let addr = Address::new(
            "local",
            JsonValue::Null,
            Some(JsonValue::string("mitzi")),
        );
        assert_eq!(addr.export().unwrap(), r#"["local",null,"mitzi"]"#);
    }

    #[test]
    fn create_rejects_single_element() {
        let value = JsonValue::array([JsonValue::string("local")]);
        assert!(Address::create(&value).is_err());
    }

    #[test]
    fn create_rejects_four_elements() {
        let value = JsonValue::array([
            JsonValue::string("local"),
            JsonValue::Null,
            JsonValue::string("a"),
            JsonValue::string("b"),
        ]);
        assert!(Address::create(&value).is_err());
    }

    #[test]
    fn create_accepts_two_elements_defaulting_callsign() {
        let value = JsonValue::array([JsonValue::string("local"), JsonValue::Null]);
        let addr = Address::create(&value).unwrap();
        assert!(addr.callsign().is_none());
    }

    #[test]
    fn parse_round_trips_udp4() {
        let text = r#"["udp4",["127.0.0.1",555],"alice"]"#;
        let addr = Address::parse(text).unwrap();
        assert_eq!(addr.export().unwrap(), text);
    }

    #[test]
    fn equality_is_string_form_equality() {
        let a = Address::new("local", JsonValue::Null, Some(JsonValue::string("x")));
        let b = Address::create(&JsonValue::array([
            JsonValue::string("local"),
            JsonValue::Null,
            JsonValue::string("x"),
        ]))
        .unwrap();
        assert_eq!(a, b);
    }
}
