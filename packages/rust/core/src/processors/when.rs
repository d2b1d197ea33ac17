use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Deserialize;

use holocron_shared::{Item, Options, Result, Step};

use crate::invoke::Context;
use crate::processor::{Processor, Stream, parse_options};
use crate::schema::{Constraint, Schema};
use crate::when::{Condition, condition_constraint};

/// Runs a wrapped processor over the items matching a condition only.
///
/// Items that do not match skip the wrapped processor and keep their place
/// relative to its output as far as the wrapped processor allows: anything
/// set aside while it was producing an item is emitted before that item.
#[derive(Debug, Default, Clone, Copy)]
pub struct When;

#[derive(Deserialize)]
struct WhenOptions {
    processor: Step,
    when: Condition,
}

impl Processor for When {
    fn schema(&self) -> Schema {
        Schema::new()
            .required(
                "processor",
                Constraint::Object(
                    Schema::new()
                        .required("name", Constraint::String)
                        .allow_unknown(),
                ),
            )
            .required("when", condition_constraint())
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let WhenOptions { processor, when } = parse_options("when", options)?;

        let shared = Rc::new(RefCell::new(Shared {
            upstream: stream,
            passthrough: VecDeque::new(),
            condition: when,
        }));

        let selected: Stream<'a> = Box::new(Selected {
            shared: Rc::clone(&shared),
        });
        let inner = cx.invoke(vec![processor], selected)?;

        Ok(Box::new(Routed {
            shared,
            inner: Some(inner),
            stashed: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// State shared by the selected view and the routed output.
struct Shared<'a> {
    upstream: Stream<'a>,
    /// Non-matching items (and upstream errors) waiting to be emitted.
    passthrough: VecDeque<Result<Item>>,
    condition: Condition,
}

/// The view of the upstream the wrapped processor consumes: matching items
/// only. Everything else is parked in the passthrough queue.
struct Selected<'a> {
    shared: Rc<RefCell<Shared<'a>>>,
}

impl Iterator for Selected<'_> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut shared = self.shared.borrow_mut();
        loop {
            match shared.upstream.next()? {
                Ok(item) if shared.condition.matches(&item) => return Some(Ok(item)),
                other => shared.passthrough.push_back(other),
            }
        }
    }
}

struct Routed<'a> {
    shared: Rc<RefCell<Shared<'a>>>,
    /// `None` once the wrapped processor is exhausted.
    inner: Option<Stream<'a>>,
    /// Wrapped output held back until the passthrough queue is drained.
    stashed: Option<Result<Item>>,
}

impl Iterator for Routed<'_> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.shared.borrow_mut().passthrough.pop_front() {
            return Some(item);
        }
        if let Some(item) = self.stashed.take() {
            return Some(item);
        }

        if let Some(inner) = self.inner.as_mut() {
            // No borrow of the shared state may be held here: pulling the
            // wrapped processor pulls `Selected`.
            match inner.next() {
                Some(item) => {
                    let parked = self.shared.borrow_mut().passthrough.pop_front();
                    return match parked {
                        Some(first) => {
                            self.stashed = Some(item);
                            Some(first)
                        }
                        None => Some(item),
                    };
                }
                None => self.inner = None,
            }
        }

        // The wrapped processor is done. Whatever it left behind goes
        // through as is, matching or not.
        let mut shared = self.shared.borrow_mut();
        match shared.passthrough.pop_front() {
            Some(item) => Some(item),
            None => shared.upstream.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::Application;
    use crate::processor::processor_fn;
    use holocron_shared::{ErrorKind, HolocronError, Value};

    fn testapp() -> Application {
        let app = Application::default();
        app.add_processor("when", Arc::new(When));
        app.add_processor(
            "spam",
            Arc::new(processor_fn(|_cx, stream, options| {
                let text = options.get("text").cloned().unwrap_or(json!(42));
                Ok(Box::new(stream.map(move |item| {
                    let mut item = item?;
                    item.insert("spam", Value::from(text.clone()));
                    Ok(item)
                })))
            })),
        );
        app.add_processor(
            "rice",
            Arc::new(processor_fn(|_cx, stream, _options| {
                Ok(Box::new(stream.chain(std::iter::once(Ok(Item::from([("content", "rice")]))))))
            })),
        );
        // Folds pairs of items into one whose key is the sum of both keys.
        app.add_processor(
            "eggs",
            Arc::new(processor_fn(|_cx, mut stream, _options| {
                Ok(Box::new(std::iter::from_fn(move || {
                    let a = stream.next()?;
                    let b = stream.next()?;
                    Some(a.and_then(|a| {
                        let b = b?;
                        let key = |item: &Item| match item.get("key") {
                            Some(Value::Integer(n)) => *n,
                            _ => 0,
                        };
                        Ok(Item::from([("key", key(&a) + key(&b))]))
                    }))
                })))
            })),
        );
        app
    }

    fn keyed(amount: i64) -> Vec<Item> {
        (0..amount)
            .map(|i| {
                Item::from([
                    ("content", Value::from("the great jedi")),
                    ("key", Value::from(i)),
                ])
            })
            .collect()
    }

    fn run(
        app: &Application,
        processor: serde_json::Value,
        when: serde_json::Value,
        items: Vec<Item>,
    ) -> Vec<Item> {
        app.invoke(
            vec![Step::new("when").option("processor", processor).option("when", when)],
            items,
        )
        .unwrap()
        .collect::<Result<_>>()
        .unwrap()
    }

    fn even() -> serde_json::Value {
        json!([{"operator": "match", "attribute": "key", "pattern": "\\d*[02468]$"}])
    }

    fn odd() -> serde_json::Value {
        json!([{"operator": "match", "attribute": "key", "pattern": "\\d*[13579]$"}])
    }

    #[test]
    fn single_item_matched_and_skipped() {
        let app = testapp();
        let item = Item::from([("content", "eh"), ("author", "yoda")]);

        let out = run(
            &app,
            json!({"name": "spam"}),
            json!([{"operator": "match", "attribute": "author", "pattern": "yoda"}]),
            vec![item.clone()],
        );
        let mut spammed = item.clone();
        spammed.insert("spam", 42_i64);
        assert_eq!(out, [spammed]);

        let out = run(
            &app,
            json!({"name": "spam"}),
            json!([{"operator": "match", "attribute": "author", "pattern": "luke"}]),
            vec![item.clone()],
        );
        assert_eq!(out, [item]);
    }

    #[test]
    fn many_items_keep_their_order() {
        let app = testapp();
        for amount in [0, 1, 2, 5, 10] {
            let out = run(&app, json!({"name": "spam"}), even(), keyed(amount));
            let expected: Vec<Item> = keyed(amount)
                .into_iter()
                .enumerate()
                .map(|(i, mut item)| {
                    if i % 2 == 0 {
                        item.insert("spam", 42_i64);
                    }
                    item
                })
                .collect();
            assert_eq!(out, expected, "amount = {amount}");
        }
    }

    #[test]
    fn wrapped_options_are_forwarded() {
        let app = testapp();
        let out = run(&app, json!({"name": "spam", "text": "eh"}), even(), keyed(1));
        assert_eq!(out[0].get("spam"), Some(&Value::from("eh")));
    }

    #[test]
    fn populating_processor_appends_after_passthrough() {
        let app = testapp();
        for amount in [0, 1, 2, 5, 10] {
            let out = run(&app, json!({"name": "rice"}), even(), keyed(amount));
            let mut expected = keyed(amount);
            expected.push(Item::from([("content", "rice")]));
            assert_eq!(out, expected, "amount = {amount}");
        }
    }

    #[test]
    fn folding_processor_interleaves_with_passthrough() {
        let app = testapp();
        let out = run(&app, json!({"name": "eggs"}), odd(), keyed(5));
        let items = keyed(5);
        assert_eq!(
            out,
            [
                items[0].clone(),
                items[2].clone(),
                Item::from([("key", 4_i64)]),
                items[4].clone(),
            ]
        );
    }

    #[test]
    fn nested_when_composes() {
        let app = testapp();
        let out = run(
            &app,
            json!({
                "name": "when",
                "processor": {"name": "spam"},
                "when": [{"operator": "match", "attribute": "key", "pattern": "[0-4]$"}],
            }),
            even(),
            keyed(8),
        );

        for item in &out {
            let key = match item.get("key") {
                Some(Value::Integer(n)) => *n,
                _ => unreachable!(),
            };
            assert_eq!(item.contains_key("spam"), key % 2 == 0 && key <= 4, "key = {key}");
        }
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn upstream_errors_pass_through() {
        let app = testapp();
        let upstream: Stream<'_> = Box::new(
            vec![
                Ok(Item::from([("key", 0_i64)])),
                Err(HolocronError::processor("source", "broken")),
                Ok(Item::from([("key", 1_i64)])),
            ]
            .into_iter(),
        );
        let results: Vec<Result<Item>> = app
            .invoke_stream(
                vec![Step::new("when")
                    .option("processor", json!({"name": "spam"}))
                    .option("when", even())],
                upstream,
            )
            .unwrap()
            .collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().is_ok_and(|item| item.contains_key("spam")));
        assert!(results[1].is_err());
        assert!(results[2].as_ref().is_ok_and(|item| !item.contains_key("spam")));
    }

    #[test]
    fn unknown_wrapped_processor_fails_at_invoke() {
        let app = testapp();
        let err = app
            .invoke(
                vec![Step::new("when")
                    .option("processor", json!({"name": "nope"}))
                    .option("when", even())],
                keyed(3),
            )
            .err()
            .expect("must fail");
        assert_eq!(err.kind(), ErrorKind::UnknownProcessor);
    }

    #[test]
    fn invalid_clauses_are_reported_by_field() {
        let app = testapp();
        for (when, field) in [
            (json!([{"operator": "search", "attribute": "a", "pattern": "b"}]), "when[0].operator"),
            (json!([{"operator": "match", "attribute": "a", "pattern": "("}]), "when[0].pattern"),
            (json!([{"operator": "match", "pattern": "b"}]), "when[0].attribute"),
            (json!("item.key == 1"), "when"),
        ] {
            let err = app
                .invoke(
                    vec![Step::new("when")
                        .option("processor", json!({"name": "spam"}))
                        .option("when", when)],
                    Vec::new(),
                )
                .err()
                .expect("must fail");
            assert_eq!(err.kind(), ErrorKind::InvalidOption);
            assert!(err.to_string().contains(&format!("field {field}:")), "{err}");
        }
    }

    #[test]
    fn processor_without_name_is_rejected() {
        let app = testapp();
        let err = app
            .invoke(
                vec![Step::new("when")
                    .option("processor", json!({"text": "eh"}))
                    .option("when", even())],
                Vec::new(),
            )
            .err()
            .expect("must fail");
        assert_eq!(
            err.to_string(),
            "invalid option for 'when': field processor.name: required option is missing"
        );
    }
}
