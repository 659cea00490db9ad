//! Values produced by field providers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of evaluating a single field.
///
/// `Absent` is the typed "no value" outcome: the record consumer omits the
/// field instead of writing a misleading empty string. It is never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer payload, typically a numeric principal id.
    Integer(i64),
    /// Text payload.
    Text(String),
    /// No value is available in the current context.
    #[default]
    Absent,
}

impl FieldValue {
    /// Returns true when no value is available.
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Borrow the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Converts an arbitrary JSON value stored by the host into a field value.
    ///
    /// `null` maps to `Absent`, strings and i64 numbers keep their type, and
    /// every other shape is carried as its compact JSON encoding.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::String(text) => FieldValue::Text(text),
            Value::Number(number) if number.is_i64() => number.as_i64().map(FieldValue::Integer).unwrap_or_default(),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Converts into a JSON value, returning `None` for `Absent`.
    pub fn into_json(self) -> Option<Value> {
        match self {
            FieldValue::Integer(number) => Some(Value::from(number)),
            FieldValue::Text(text) => Some(Value::String(text)),
            FieldValue::Absent => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(number) => write!(f, "{number}"),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Absent => f.write_str("<absent>"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Identifier of an authenticated principal as reported by an identity backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrincipalId {
    Numeric(i64),
    Text(String),
}

impl PrincipalId {
    /// Interprets a raw string, preferring the numeric form when it parses.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(
            trimmed
                .parse::<i64>()
                .map(PrincipalId::Numeric)
                .unwrap_or_else(|_| PrincipalId::Text(trimmed.to_string())),
        )
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalId::Numeric(id) => write!(f, "{id}"),
            PrincipalId::Text(id) => f.write_str(id),
        }
    }
}

impl From<PrincipalId> for FieldValue {
    fn from(value: PrincipalId) -> Self {
        match value {
            PrincipalId::Numeric(id) => FieldValue::Integer(id),
            PrincipalId::Text(id) => FieldValue::Text(id),
        }
    }
}
