//! Lenient numeric coercion for externally stored counters.
//!
//! Nation and military records come from a loosely typed entity store where
//! counters may be missing, null, negative, stringly typed, or garbage. Every
//! such counter passes through [`count`] exactly once, at deserialization.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce an arbitrary JSON value into a non-negative whole count.
///
/// Numbers are floored, numeric strings are parsed, and anything else
/// (null, NaN, negatives, booleans, objects) becomes zero.
pub fn count(value: &Value) -> u64 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() && v > 0.0 => v.floor() as u64,
        _ => 0,
    }
}

/// Serde adapter applying [`count`] to a field.
///
/// Use together with `#[serde(default)]` so that absent fields are zero too.
pub fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(count).unwrap_or(0))
}
