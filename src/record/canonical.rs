//! Canonical hash-input encoding.
//!
//! Identical logical data must always produce identical bytes for the
//! hasher. Fields are name-tagged and newline-terminated, optional fields
//! carry a presence byte so `None` and `Some("")` stay distinct, and
//! structured properties render as minified JSON with keys sorted at
//! every nesting depth.

use crate::core::Timestamp;
use serde_json::Value;
use std::collections::BTreeMap;

/// Presence byte for a populated optional field.
const PRESENT: u8 = 0x01;
/// Presence byte for an absent optional field.
const ABSENT: u8 = 0x00;

/// Encode a required field as `name : value \n`.
pub fn field(name: &str, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + value.len() + 2);
    out.extend_from_slice(name.as_bytes());
    out.push(b':');
    out.extend_from_slice(value);
    out.push(b'\n');
    out
}

/// Encode an optional field with an explicit presence byte.
pub fn optional_field(name: &str, value: Option<&str>) -> Vec<u8> {
    match value {
        Some(v) => {
            let mut bytes = Vec::with_capacity(v.len() + 1);
            bytes.push(PRESENT);
            bytes.extend_from_slice(v.as_bytes());
            field(name, &bytes)
        }
        None => field(name, &[ABSENT]),
    }
}

/// Canonical timestamp form: RFC 3339 UTC, microsecond precision, `Z` suffix.
pub fn canonical_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Render a JSON value canonically: minified, object keys sorted ascending
/// by UTF-8 byte order at every depth, array order preserved.
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let inner: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", json_string(k), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        scalar => serde_json::to_string(scalar).unwrap_or_default(),
    }
}

/// Render a properties map canonically.
pub fn canonical_properties(props: &BTreeMap<String, Value>) -> String {
    let inner: Vec<String> = props
        .iter()
        .map(|(k, v)| format!("{}:{}", json_string(k), canonical_json(v)))
        .collect();
    format!("{{{}}}", inner.join(","))
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_default()
}
