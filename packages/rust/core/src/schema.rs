//! Declarative option schemas and the shared validation routine.
//!
//! Every processor describes the options it accepts as a [`Schema`]: a list
//! of named fields, each with a [`Constraint`]. `invoke` runs
//! [`Schema::validate`] before a processor body is reached, so a bad option is
//! reported against its field path (e.g. `when[0].pattern`) and never
//! half-applied.

use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};

use holocron_shared::Options;

// ---------------------------------------------------------------------------
// Constraint
// ---------------------------------------------------------------------------

/// Expected shape of a single option value.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Anything, including `null`.
    Any,
    Bool,
    Integer,
    Number,
    String,
    /// A string that compiles as a regular expression.
    Regex,
    /// A string from a closed set.
    Enum(&'static [&'static str]),
    /// An array whose elements all satisfy the inner constraint.
    Array(Box<Constraint>),
    /// A fixed-length array with one constraint per position.
    Tuple(Vec<Constraint>),
    /// An object with arbitrary keys whose values satisfy the inner constraint.
    Map(Box<Constraint>),
    /// An object with declared fields.
    Object(Schema),
    /// At least one of the alternatives.
    Either(Vec<Constraint>),
}

impl Constraint {
    pub fn array(inner: Constraint) -> Self {
        Self::Array(Box::new(inner))
    }

    pub fn map(inner: Constraint) -> Self {
        Self::Map(Box::new(inner))
    }

    fn check(&self, path: &str, value: &Value) -> Result<(), Violation> {
        match (self, value) {
            (Self::Any, _) => Ok(()),
            (Self::Bool, Value::Bool(_)) => Ok(()),
            (Self::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (Self::Number, Value::Number(_)) => Ok(()),
            (Self::String, Value::String(_)) => Ok(()),
            (Self::Regex, Value::String(pattern)) => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| {
                    Violation::new(path, format!("value is not a valid regular expression: {e}"))
                }),
            (Self::Enum(choices), Value::String(s)) => {
                if choices.contains(&s.as_str()) {
                    Ok(())
                } else {
                    Err(Violation::new(path, format!("value should be {}", self.describe())))
                }
            }
            (Self::Array(inner), Value::Array(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| inner.check(&index_path(path, i), item)),
            (Self::Tuple(positions), Value::Array(items)) => {
                if items.len() != positions.len() {
                    return Err(Violation::new(
                        path,
                        format!("value should be an array of {} elements", positions.len()),
                    ));
                }
                positions
                    .iter()
                    .zip(items)
                    .enumerate()
                    .try_for_each(|(i, (c, item))| c.check(&index_path(path, i), item))
            }
            (Self::Map(inner), Value::Object(map)) => map
                .iter()
                .try_for_each(|(key, item)| inner.check(&key_path(path, key), item)),
            (Self::Object(schema), Value::Object(map)) => schema.validate_at(path, map),
            (Self::Either(alternatives), _) => {
                if alternatives.iter().any(|c| c.check(path, value).is_ok()) {
                    Ok(())
                } else {
                    Err(self.type_error(path))
                }
            }
            _ => Err(self.type_error(path)),
        }
    }

    fn type_error(&self, path: &str) -> Violation {
        Violation::new(path, format!("value should be of type {}", self.describe()))
    }

    /// Human-readable name of the expected shape.
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any".into(),
            Self::Bool => "boolean".into(),
            Self::Integer => "integer".into(),
            Self::Number => "number".into(),
            Self::String => "string".into(),
            Self::Regex => "regular expression".into(),
            Self::Enum(choices) => {
                let quoted: Vec<_> = choices.iter().map(|c| format!("'{c}'")).collect();
                format!("one of {}", quoted.join(", "))
            }
            Self::Array(inner) => format!("array of {}", inner.describe()),
            Self::Tuple(positions) => {
                let inner: Vec<_> = positions.iter().map(Constraint::describe).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Map(inner) => format!("object of {}", inner.describe()),
            Self::Object(_) => "object".into(),
            Self::Either(alternatives) => {
                let inner: Vec<_> = alternatives.iter().map(Constraint::describe).collect();
                inner.join(" or ")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Field {
    name: String,
    constraint: Constraint,
    required: bool,
}

/// The set of options a processor (or a nested option object) accepts.
///
/// Closed by default: keys that are not declared are rejected unless
/// [`Schema::allow_unknown`] is set.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
    open: bool,
}

impl Schema {
    /// An empty, closed schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional field.
    pub fn optional(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.fields.push(Field {
            name: name.into(),
            constraint,
            required: false,
        });
        self
    }

    /// Declare a field that must be present.
    pub fn required(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.fields.push(Field {
            name: name.into(),
            constraint,
            required: true,
        });
        self
    }

    /// Accept keys that are not declared, without checking them.
    pub fn allow_unknown(mut self) -> Self {
        self.open = true;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Validate a full options mapping.
    pub fn validate(&self, options: &Options) -> Result<(), Violation> {
        self.validate_at("", options)
    }

    fn validate_at(&self, path: &str, map: &Map<String, Value>) -> Result<(), Violation> {
        for (key, value) in map {
            match self.fields.iter().find(|f| f.name == *key) {
                Some(field) => field.constraint.check(&key_path(path, key), value)?,
                None if self.open => {}
                None => {
                    return Err(Violation::new(key_path(path, key), "unrecognized option"));
                }
            }
        }

        if let Some(missing) = self
            .fields
            .iter()
            .find(|f| f.required && !map.contains_key(&f.name))
        {
            return Err(Violation::new(
                key_path(path, &missing.name),
                "required option is missing",
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// A single schema failure: which field, and what was wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted/indexed path to the offending value, e.g. `when[0].pattern`.
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {}: {}", self.field, self.message)
    }
}

fn key_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}
