//! Fetched records.
//!
//! Record shapes differ per category and change without notice, so an
//! [`Item`] keeps the raw JSON object and exposes the few fields pagination
//! depends on. Typed views are parsed on demand with [`Item::parse`].

use crate::TypeError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record from a result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(TypeError::InvalidItem(format!(
                "expected an object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// The record id, whether the API sent it as a number or a string.
    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(scalar_to_string)
    }

    /// The `postedAtPrecise` value verbatim (`"1706745600.000000"`).
    ///
    /// This is what the time-windowed categories continue from, so it is kept
    /// as the exact text the server produced.
    pub fn posted_at_precise(&self) -> Option<String> {
        self.0.get("postedAtPrecise").and_then(scalar_to_string)
    }

    /// `postedAtPrecise` as a timestamp, dropping sub-second precision.
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        let precise = self.posted_at_precise()?;
        let secs = precise.split('.').next()?.parse::<i64>().ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize into a typed view.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, TypeError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| TypeError::InvalidItem(e.to_string()))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
