//! Selective routing: declarative clauses that decide which items a
//! processor acts on.
//!
//! A condition is a list of clauses combined with logical AND:
//!
//! ```json
//! [{ "operator": "match", "attribute": "source", "pattern": ".*\\.md$" }]
//! ```
//!
//! Clauses test the string form of an item field. An item without the field
//! fails the clause. No condition at all selects every item.

use regex::Regex;
use serde::Deserialize;

use holocron_shared::{HolocronError, Item, Result};

use crate::processor::Stream;
use crate::schema::{Constraint, Schema};

/// Schema constraint for a clause list, for use in processor schemas.
pub fn condition_constraint() -> Constraint {
    Constraint::array(Constraint::Object(
        Schema::new()
            .required("operator", Constraint::Enum(&["match"]))
            .required("attribute", Constraint::String)
            .required("pattern", Constraint::Regex),
    ))
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

/// Wire form of a clause, before its pattern is compiled.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operator", rename_all = "lowercase")]
pub enum ClauseSpec {
    Match { attribute: String, pattern: String },
}

/// A single compiled test against one item field.
#[derive(Debug, Clone)]
pub enum Clause {
    /// Regular expression match, anchored at the start of the field text.
    Match { attribute: String, pattern: Regex },
}

impl Clause {
    /// Build a `match` clause.
    pub fn matching(attribute: impl Into<String>, pattern: &str) -> Result<Self> {
        let anchored = Regex::new(&format!("^(?:{pattern})")).map_err(|e| {
            let message = format!("invalid regular expression: {e}");
            HolocronError::invalid_option("when", "pattern", message)
        })?;
        Ok(Self::Match {
            attribute: attribute.into(),
            pattern: anchored,
        })
    }

    /// Whether `item` satisfies this clause.
    pub fn eval(&self, item: &Item) -> bool {
        match self {
            Self::Match { attribute, pattern } => item
                .get(attribute)
                .is_some_and(|value| pattern.is_match(&value.to_string())),
        }
    }
}

impl TryFrom<ClauseSpec> for Clause {
    type Error = HolocronError;

    fn try_from(spec: ClauseSpec) -> Result<Self> {
        match spec {
            ClauseSpec::Match { attribute, pattern } => Clause::matching(attribute, &pattern),
        }
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// A conjunction of clauses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<ClauseSpec>")]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Whether every clause holds for `item`. An empty condition holds for all.
    pub fn matches(&self, item: &Item) -> bool {
        self.clauses.iter().all(|clause| clause.eval(item))
    }
}

impl TryFrom<Vec<ClauseSpec>> for Condition {
    type Error = HolocronError;

    fn try_from(specs: Vec<ClauseSpec>) -> Result<Self> {
        Ok(Self {
            clauses: specs
                .into_iter()
                .map(Clause::try_from)
                .collect::<Result<_>>()?,
        })
    }
}

/// Whether `item` is selected by an optional condition.
pub fn is_selected(condition: Option<&Condition>, item: &Item) -> bool {
    condition.is_none_or(|c| c.matches(item))
}

/// Apply `transform` to the selected items of `stream`, passing the rest
/// through untouched and in place.
///
/// This is the per-item form of selective routing used by processors that
/// take a `when` option. Errors already in the stream pass through as is.
pub fn selective<'a, F>(
    stream: Stream<'a>,
    condition: Option<Condition>,
    mut transform: F,
) -> Stream<'a>
where
    F: FnMut(Item) -> Result<Item> + 'a,
{
    Box::new(stream.map(move |item| {
        let item = item?;
        if is_selected(condition.as_ref(), &item) {
            transform(item)
        } else {
            Ok(item)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::from_items;
    use holocron_shared::Value;
    use serde_json::json;

    fn item() -> Item {
        Item::from([
            ("content", Value::from("eh")),
            ("author", Value::from("yoda")),
            ("source", Value::from("about/index.md")),
        ])
    }

    fn condition(value: serde_json::Value) -> Condition {
        serde_json::from_value(value).expect("valid condition")
    }

    fn matching(attribute: &str, pattern: &str) -> Condition {
        condition(json!([{"operator": "match", "attribute": attribute, "pattern": pattern}]))
    }

    #[test]
    fn match_is_anchored_at_start() {
        let cond = matching("source", "about");
        assert!(cond.matches(&item()));

        let cond = matching("source", "index");
        assert!(!cond.matches(&item()));

        let cond = matching("source", ".*\\.md");
        assert!(cond.matches(&item()));
    }

    #[test]
    fn clauses_are_anded() {
        let cond = condition(json!([
            {"operator": "match", "attribute": "author", "pattern": "yoda"},
            {"operator": "match", "attribute": "source", "pattern": ".*\\.md$"},
        ]));
        assert!(cond.matches(&item()));

        let cond = condition(json!([
            {"operator": "match", "attribute": "author", "pattern": "yoda"},
            {"operator": "match", "attribute": "source", "pattern": ".*\\.rst$"},
        ]));
        assert!(!cond.matches(&item()));
    }

    #[test]
    fn missing_attribute_fails() {
        let cond = matching("title", ".*");
        assert!(!cond.matches(&item()));
    }

    #[test]
    fn non_string_fields_use_their_text() {
        let item = Item::from([("key", Value::from(42_i64))]);
        let cond = matching("key", "4\\d$");
        assert!(cond.matches(&item));
    }

    #[test]
    fn empty_and_absent_select_everything() {
        assert!(Condition::default().matches(&item()));
        assert!(is_selected(None, &item()));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let clauses = json!([{"operator": "search", "attribute": "a", "pattern": "b"}]);
        let result: std::result::Result<Condition, _> = serde_json::from_value(clauses);
        assert!(result.is_err());
    }

    #[test]
    fn selective_leaves_non_matching_items_untouched() {
        let items: Vec<Item> = (0..5_i64)
            .map(|i| Item::from([("key", Value::from(i))]))
            .collect();
        let cond = matching("key", "[02468]$");

        let out: Vec<Item> = selective(from_items(items.clone()), Some(cond), |mut item| {
            item.insert("spam", 42_i64);
            Ok(item)
        })
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(out.len(), items.len());
        for (i, (before, after)) in items.iter().zip(&out).enumerate() {
            if i % 2 == 0 {
                assert_eq!(after.get("spam"), Some(&Value::Integer(42)));
            } else {
                assert_eq!(before, after);
            }
        }
    }
}
