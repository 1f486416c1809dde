//! Lenient Deserializers
//!
//! The remote layer is loose about shapes: ids arrive as strings or numbers,
//! and question options arrive as arrays, JSON-encoded strings, plain
//! comma-separated text, or not at all. Everything is normalized here so the
//! rest of the crate only ever sees `String` and `Vec<String>`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept `"42"` or `42`
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Like [`string_or_number`], with `null` mapping to `None`
pub fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!(
            "expected string, number or null, got {}",
            other
        ))),
    }
}

/// Text that may arrive as `null` or a number; `null` reads as empty
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_or_number(deserializer)?.unwrap_or_default())
}

/// Positions sent as `1`, `"1"` or `null`; anything unusable reads as `None`
pub fn optional_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(value.and_then(|v| u32::try_from(v).ok()))
}

/// Options in any of the shapes the remote store produces
pub fn options_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_options(Value::deserialize(deserializer)?))
}

/// Convert a raw options value into an ordered list of strings
pub fn normalize_options(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(values) => values.into_iter().filter_map(option_text).collect(),
        Value::String(s) => decode_options_string(&s),
        other => option_text(other).into_iter().collect(),
    }
}

fn decode_options_string(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(values)) => values.into_iter().filter_map(option_text).collect(),
        // Double-encoded: a JSON string holding the JSON array
        Ok(Value::String(inner)) => decode_options_string(&inner),
        _ => trimmed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn option_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
