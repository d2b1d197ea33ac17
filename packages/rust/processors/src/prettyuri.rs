//! Pretty URIs: `a/b.html` becomes `a/b/index.html`.

use serde::Deserialize;

use holocron_core::{
    Condition, Context, Processor, Schema, Stream, condition_constraint, parse_options, selective,
};
use holocron_shared::{Item, Options, Result};

/// Moves every page into its own directory as `index.html`, so that web
/// servers can serve it from a URL without an extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrettyUri;

#[derive(Deserialize)]
struct PrettyUriOptions {
    when: Option<Condition>,
}

impl Processor for PrettyUri {
    fn schema(&self) -> Schema {
        Schema::new().optional("when", condition_constraint())
    }

    fn process<'a>(
        &self,
        _cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let PrettyUriOptions { when } = parse_options("prettyuri", options)?;
        Ok(selective(stream, when, |item| Ok(prettify(item))))
    }
}

fn prettify(mut item: Item) -> Item {
    if let Some(pretty) = item.get_str("destination").and_then(pretty_destination) {
        item.insert("destination", pretty);
    }
    item
}

fn pretty_destination(destination: &str) -> Option<String> {
    let (parent, name) = match destination.rsplit_once('/') {
        Some((parent, name)) => (Some(parent), name),
        None => (None, destination),
    };
    if name.is_empty() || name == "index.html" || name == "index.htm" {
        return None;
    }

    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    Some(match parent {
        Some(parent) => format!("{parent}/{stem}/index.html"),
        None => format!("{stem}/index.html"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use holocron_core::Application;
    use holocron_shared::{ErrorKind, Step};

    #[test]
    fn rewrites_destinations() {
        for (before, after) in [
            ("about.html", "about/index.html"),
            ("posts/skywalker.html", "posts/skywalker/index.html"),
            ("posts/skywalker.tar.gz", "posts/skywalker.tar/index.html"),
            ("feed", "feed/index.html"),
            (".htaccess", ".htaccess/index.html"),
            ("index.html", "index.html"),
            ("posts/index.htm", "posts/index.htm"),
        ] {
            let out = prettify(Item::from([("destination", before)]));
            assert_eq!(out.get_str("destination"), Some(after), "{before}");
        }
    }

    #[test]
    fn items_without_destination_pass() {
        let item = Item::from([("content", "eh")]);
        assert_eq!(prettify(item.clone()), item);
    }

    fn app() -> Application {
        let app = Application::default();
        app.add_processor("prettyuri", Arc::new(PrettyUri));
        app
    }

    #[test]
    fn respects_when() {
        let out: Vec<Item> = app()
            .invoke(
                vec![Step::new("prettyuri").option(
                    "when",
                    json!([{"operator": "match", "attribute": "source", "pattern": ".*\\.md$"}]),
                )],
                [
                    Item::from([("source", "about.md"), ("destination", "about.html")]),
                    Item::from([("source", "logo.svg"), ("destination", "logo.html")]),
                ],
            )
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(out[0].get_str("destination"), Some("about/index.html"));
        assert_eq!(out[1].get_str("destination"), Some("logo.html"));
    }

    #[test]
    fn rejects_unknown_options() {
        let err = app()
            .invoke(vec![Step::new("prettyuri").option("pretty", true)], Vec::new())
            .err()
            .expect("must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert_eq!(
            err.to_string(),
            "invalid option for 'prettyuri': field pretty: unrecognized option"
        );

        let err = app()
            .invoke(vec![Step::new("prettyuri").option("when", "x")], Vec::new())
            .err()
            .expect("must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
    }
}
