//! Canonical ("strict") JSON: a deterministic, ASCII-only subset of JSON used
//! for hashing, signing and address stringification.
//!
//! Canonicalization rules (see the component design for the full contract):
//! scalars render as plain JSON; arrays have no whitespace between elements;
//! object keys are sorted lexicographically by their *encoded* form and
//! pairs are joined without whitespace; anything outside this grammar
//! (non-finite floats, non-string object keys) is a [`ProtoError::SerializationError`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::ProtoError;

/// A JSON value restricted to the shapes canonical JSON can represent.
///
/// This is the one place in the protocol that introspects message structure;
/// everything else treats frame bodies as opaque bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// A JSON number with no fractional or exponent part.
    Int(i64),
    /// A JSON number with a fractional or exponent part.
    Float(f64),
    /// A JSON string.
    String(String),
    /// A JSON array, order-preserving.
    Array(Vec<JsonValue>),
    /// A JSON object. Stored as a `BTreeMap` so iteration is already
    /// key-sorted; [`strict_encode`] still re-sorts by encoded form to
    /// honor the exact contract.
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    /// Shorthand for constructing a [`JsonValue::String`].
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Shorthand for constructing a [`JsonValue::Array`].
    #[must_use]
    pub fn array(items: impl IntoIterator<Item = JsonValue>) -> Self {
        Self::Array(items.into_iter().collect())
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Parse UTF-8 JSON bytes (not necessarily canonical) into a [`JsonValue`].
pub fn parse(bytes: &[u8]) -> Result<JsonValue, ProtoError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ProtoError::SerializationError(e.to_string()))?;
    Ok(value.into())
}

/// Encode a value as canonical JSON bytes.
pub fn strict_encode(value: &JsonValue) -> Result<Vec<u8>, ProtoError> {
    let mut out = String::new();
    write_strict(value, &mut out)?;
    Ok(out.into_bytes())
}

/// Encode a value as a canonical JSON `String`. Equivalent to
/// [`strict_encode`] followed by a lossless UTF-8 decode.
pub fn strict_string(value: &JsonValue) -> Result<String, ProtoError> {
    let mut out = String::new();
    write_strict(value, &mut out)?;
    Ok(out)
}

fn write_strict(value: &JsonValue, out: &mut String) -> Result<(), ProtoError> {
    match value {
        JsonValue::Null => out.push_str("null"),
        JsonValue::Bool(true) => out.push_str("true"),
        JsonValue::Bool(false) => out.push_str("false"),
        JsonValue::Int(i) => {
            let _ = write!(out, "{i}");
        }
        JsonValue::Float(f) => {
            if !f.is_finite() {
                return Err(ProtoError::SerializationError(format!(
                    "non-finite float {f} has no canonical JSON representation"
                )));
            }
            write_canonical_float(*f, out);
        }
        JsonValue::String(s) => write_string(s, out),
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_strict(item, out)?;
            }
            out.push(']');
        }
        JsonValue::Object(map) => {
            let mut encoded_pairs = Vec::with_capacity(map.len());
            for (k, v) in map {
                let mut key_out = String::new();
                write_string(k, &mut key_out);
                let mut val_out = String::new();
                write_strict(v, &mut val_out)?;
                encoded_pairs.push((key_out, val_out));
            }
            encoded_pairs.sort_by(|a, b| a.0.cmp(&b.0));
            out.push('{');
            for (i, (k, v)) in encoded_pairs.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&k);
                out.push(':');
                out.push_str(&v);
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_canonical_float(f: f64, out: &mut String) {
    if f == f.trunc() && f.abs() < 1e15 {
        let _ = write!(out, "{f:.1}");
    } else {
        let _ = write!(out, "{f}");
    }
}

/// Write a JSON string literal with ASCII-only output: control characters and
/// anything outside the printable ASCII range are `\u` escaped, matching the
/// `ensure_ascii` behavior canonical JSON depends on for a stable hash.
fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || (c as u32) > 0x7E => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
