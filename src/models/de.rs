//! Lenient serde helpers for loosely typed upstream JSON.
//!
//! DOI registration agencies disagree on shapes: `title` may be a string or
//! a list, `volume` a string or a number, `ISSN` a list or a single string.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A string, a number, or the first scalar of a list; anything else is empty
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().find_map(scalar_to_string),
        Some(other) => scalar_to_string(other),
        None => None,
    }
    .unwrap_or_default())
}

/// A list of scalars, or a single scalar as a one-element list
pub fn strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    })
}
