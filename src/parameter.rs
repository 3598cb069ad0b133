//! Key/value attributes appended to structured records.
//!
//! Anything implementing [`KeyValue`] can be attached to a record emitted
//! through [`Dispatcher::data`](crate::Dispatcher::data). [`Parameter`] is the
//! owned, JSON-backed implementation; tuples of `(key, value)` work too.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A single attribute rendered as `key="value"`.
pub trait KeyValue {
    /// Attribute name.
    fn key(&self) -> &str;
    /// Attribute value as it should appear between the quotes.
    fn value(&self) -> String;
}

/// Owned key/value pair.
///
/// `Display` renders the pair as a JSON object, which also makes the type
/// usable as a lightweight error value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    key: String,
    value: Value,
}

impl Parameter {
    /// Build a parameter from any value convertible into JSON.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Raw JSON value.
    pub fn json_value(&self) -> &Value {
        &self.value
    }
}

/// Strings are emitted without JSON quoting; every other value uses its
/// compact JSON text.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl KeyValue for Parameter {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> String {
        render_value(&self.value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl std::error::Error for Parameter {}

impl<K, V> KeyValue for (K, V)
where
    K: AsRef<str>,
    V: fmt::Display,
{
    fn key(&self) -> &str {
        self.0.as_ref()
    }

    fn value(&self) -> String {
        self.1.to_string()
    }
}
