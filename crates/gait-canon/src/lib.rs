// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Canonical JSON encoding and content digests.
//!
//! `canonicalize` rewrites any valid JSON value into one canonical byte
//! sequence: object keys sorted lexicographically by code point, no
//! insignificant whitespace, UTF-8, numbers in their shortest round-trip
//! form. Duplicate object keys, `NaN`, `Infinity`, and trailing content
//! after the top-level value are all rejected rather than silently
//! tolerated.
//!
//! # Examples
//!
//! ```
//! use gait_canon::{canonicalize_str, digest_str};
//!
//! let a = canonicalize_str(r#"{"b":1,"a":2}"#).unwrap();
//! let b = canonicalize_str(r#"{"a": 2, "b": 1}"#).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(digest_str(r#"{"a":2,"b":1}"#).unwrap().len(), 64);
//! ```

use gait_error::{GaitError, GaitResult};
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Rewrites raw JSON bytes into canonical bytes.
///
/// # Errors
///
/// Returns [`GaitError::InvalidInput`] if `bytes` is not valid JSON, contains
/// a duplicate object key, or carries trailing content after the value.
pub fn canonicalize_slice(bytes: &[u8]) -> GaitResult<Vec<u8>> {
    let value = parse_strict(bytes)?;
    serde_json::to_vec(&value).map_err(|e| GaitError::InvalidInput {
        message: format!("failed to serialize canonical value: {e}"),
    })
}

/// Rewrites a JSON string into canonical bytes. See [`canonicalize_slice`].
///
/// # Errors
///
/// Same as [`canonicalize_slice`].
pub fn canonicalize_str(s: &str) -> GaitResult<Vec<u8>> {
    canonicalize_slice(s.as_bytes())
}

/// Serializes `value` and rewrites the result into canonical bytes.
///
/// # Errors
///
/// Returns [`GaitError::InvalidInput`] if `value` cannot be serialized to
/// JSON, or if the resulting JSON fails canonicalization.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> GaitResult<Vec<u8>> {
    let raw = serde_json::to_vec(value).map_err(|e| GaitError::InvalidInput {
        message: format!("failed to serialize value: {e}"),
    })?;
    canonicalize_slice(&raw)
}

/// Hex-encodes the SHA-256 digest of raw bytes, with no canonicalization.
///
/// Use this when `bytes` are already known to be canonical (e.g. re-hashing
/// bytes this crate just produced); prefer [`digest_slice`] for untrusted
/// input.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Canonicalizes `bytes` and returns the hex SHA-256 digest of the result.
///
/// # Errors
///
/// Same as [`canonicalize_slice`].
pub fn digest_slice(bytes: &[u8]) -> GaitResult<String> {
    Ok(sha256_hex(&canonicalize_slice(bytes)?))
}

/// Canonicalizes a JSON string and returns the hex SHA-256 digest.
///
/// # Errors
///
/// Same as [`canonicalize_slice`].
pub fn digest_str(s: &str) -> GaitResult<String> {
    digest_slice(s.as_bytes())
}

/// Serializes and canonicalizes `value`, returning its hex SHA-256 digest.
///
/// # Errors
///
/// Same as [`to_canonical_bytes`].
pub fn digest_value<T: Serialize + ?Sized>(value: &T) -> GaitResult<String> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Parses `bytes` as JSON, rejecting duplicate object keys and trailing
/// content. `NaN`/`Infinity` are rejected implicitly: they are not valid
/// JSON tokens and the underlying parser errors on them before this code
/// runs.
fn parse_strict(bytes: &[u8]) -> GaitResult<Value> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = StrictValueSeed
        .deserialize(&mut de)
        .map_err(|e| GaitError::InvalidInput {
            message: format!("invalid json: {e}"),
        })?;
    de.end().map_err(|e| GaitError::InvalidInput {
        message: format!("trailing content after json value: {e}"),
    })?;
    Ok(value)
}

struct StrictValueSeed;

impl<'de> DeserializeSeed<'de> for StrictValueSeed {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictValueVisitor)
    }
}

struct StrictValueVisitor;

impl<'de> Visitor<'de> for StrictValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a valid JSON value with no duplicate object keys")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E>
    where
        E: de::Error,
    {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| de::Error::custom("non-finite number (NaN/Infinity) is not valid JSON"))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::new();
        while let Some(elem) = seq.next_element_seed(StrictValueSeed)? {
            out.push(elem);
        }
        Ok(Value::Array(out))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(StrictValueSeed)?;
            if out.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate object key: {key}")));
            }
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sorts_object_keys() {
        let bytes = canonicalize_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(bytes, br#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn idempotent_on_already_canonical_input() {
        let once = canonicalize_str(r#"{"b":1,"a":[1,2,3]}"#).unwrap();
        let twice = canonicalize_slice(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = canonicalize_str(r#"{"a":1,"a":2}"#).unwrap_err();
        assert_eq!(err.category(), gait_error::ErrorCategory::InvalidInput);
    }

    #[test]
    fn rejects_trailing_content() {
        assert!(canonicalize_str(r#"{"a":1} garbage"#).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(canonicalize_str(r#"{"a": }"#).is_err());
    }

    #[test]
    fn rejects_non_finite_floats_via_value_serialize() {
        // Infinity/NaN cannot even be represented as JSON text, so the
        // underlying tokenizer rejects them before our visitor runs.
        assert!(canonicalize_str("NaN").is_err());
        assert!(canonicalize_str("Infinity").is_err());
    }

    #[test]
    fn digest_is_64_char_lowercase_hex() {
        let d = digest_str(r#"{"a":1}"#).unwrap();
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn semantically_equal_values_share_a_digest() {
        let a = digest_str(r#"{"a":1,"b":2}"#).unwrap();
        let b = digest_str(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(v in arb_json()) {
            let raw = serde_json::to_vec(&v).unwrap();
            if let Ok(once) = canonicalize_slice(&raw) {
                let twice = canonicalize_slice(&once).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        #[test]
        fn digest_matches_across_key_reorderings(entries in prop::collection::vec((any::<String>(), any::<i64>()), 1..6)) {
            let mut map_a = serde_json::Map::new();
            let mut reversed = entries.clone();
            reversed.reverse();
            let mut map_b = serde_json::Map::new();
            for (k, v) in &entries {
                map_a.insert(k.clone(), Value::from(*v));
            }
            for (k, v) in &reversed {
                map_b.insert(k.clone(), Value::from(*v));
            }
            if map_a.len() == entries.len() {
                let da = digest_value(&Value::Object(map_a)).unwrap();
                let db = digest_value(&Value::Object(map_b)).unwrap();
                prop_assert_eq!(da, db);
            }
        }
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            ".*".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(|m| {
                    let mut out = Map::new();
                    for (k, v) in m {
                        out.insert(k, v);
                    }
                    Value::Object(out)
                }),
            ]
        })
    }
}
