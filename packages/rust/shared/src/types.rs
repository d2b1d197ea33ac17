//! Core domain types: stream items, their values, and pipeline steps.

use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options supplied to a single processor step.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Site-wide key/values visible to every processor.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single field value carried by an [`Item`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Item(Item),
}

impl Value {
    /// Borrow the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as a date/time, if it is one.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Borrow the value as a list, if it is one.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => write_fields(f, map),
            Self::Item(item) => write_fields(f, &item.fields),
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &IndexMap<String, Value>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}: {value}")?;
    }
    f.write_str("}")
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// The unit of data flowing through a pipeline: an insertion-ordered
/// mapping of named fields.
///
/// `source` and `destination` are reserved by convention; the engine
/// never requires them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    fields: IndexMap<String, Value>,
}

impl Item {
    /// Create an empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a mutable reference to a field value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Get a field as a string slice, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set a field, returning the previous value. New fields go last.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    /// Whether the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the item has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Item {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Item {
    fn from(fields: [(K, V); N]) -> Self {
        fields.into_iter().collect()
    }
}

impl IntoIterator for Item {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One `(processor name, options)` entry of a pipe.
///
/// Serialized flat, as `{ "name": "markdown", "extensions": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Registered processor name.
    pub name: String,
    /// Every other key of the step.
    #[serde(flatten)]
    pub options: Options,
}

impl Step {
    /// A step with no options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Options::new(),
        }
    }

    /// Builder-style option setter.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_preserves_insertion_order() {
        let mut item = Item::from([("content", "eh"), ("author", "yoda")]);
        item.insert("source", "about.md");
        item.remove("author");
        item.insert("author", "luke");

        let keys: Vec<_> = item.keys().map(String::as_str).collect();
        assert_eq!(keys, ["content", "source", "author"]);
    }

    #[test]
    fn item_equality_is_by_fields() {
        let a = Item::from([("a", Value::from("b")), ("x", Value::from(42_i64))]);
        let mut b = Item::new();
        b.insert("a", "b");
        b.insert("x", 42_i64);
        assert_eq!(a, b);
    }

    #[test]
    fn value_from_json() {
        let value = Value::from(serde_json::json!({"n": 1, "f": 1.5, "l": ["x", true], "z": null}));
        let Value::Map(map) = value else {
            panic!("expected a map");
        };
        assert_eq!(map["n"], Value::Integer(1));
        assert_eq!(map["f"], Value::Float(1.5));
        assert_eq!(
            map["l"],
            Value::List(vec![Value::from("x"), Value::Bool(true)])
        );
        assert_eq!(map["z"], Value::Null);
    }

    #[test]
    fn value_display() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+00:00").unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2024-01-15T10:30:00Z");
        assert_eq!(Value::from(42_i64).to_string(), "42");
        assert_eq!(Value::from("text").to_string(), "text");
        assert_eq!(
            Value::List(vec![Value::from(1_i64), Value::from("a")]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn step_serializes_flat() {
        let step: Step =
            serde_json::from_value(serde_json::json!({"name": "metadata", "overwrite": false}))
                .expect("deserialize step");
        assert_eq!(step.name, "metadata");
        assert_eq!(step.options["overwrite"], serde_json::json!(false));

        let json = serde_json::to_value(Step::new("pipe").option("pipe", "compile")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "pipe", "pipe": "compile"}));
    }
}
