//! Evaluated configuration values.
//!
//! Only the shapes needed for alias and for_each evaluation are modelled.
//! Maps keep insertion order; anything user-visible sorts explicitly.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A fully evaluated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Ordered sequence (tuple or list)
    List(Vec<Value>),
    /// Unordered collection of unique elements
    ///
    /// Never produced by deserialization (JSON arrays become `List`).
    Set(Vec<Value>),
    /// Keyed collection (object or map)
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up an attribute of a map value.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(name),
            _ => None,
        }
    }

    /// Build a map value from key/value pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a set of strings.
    pub fn string_set<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Value::Set(items.into_iter().map(|s| Value::String(s.into())).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} = {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_json() {
        let v: Value = serde_json::from_str(r#"{"a": 1, "b": [true, null], "c": "x"}"#).unwrap();
        assert_eq!(v.get_attr("a"), Some(&Value::Number(1.0)));
        assert_eq!(
            v.get_attr("b"),
            Some(&Value::List(vec![Value::Bool(true), Value::Null]))
        );
        assert_eq!(v.get_attr("c").and_then(Value::as_str), Some("x"));
    }

    #[test]
    fn test_value_display() {
        let v = Value::map([("a", Value::from(1)), ("b", Value::from("x"))]);
        assert_eq!(v.to_string(), r#"{a = 1, b = "x"}"#);
    }
}
