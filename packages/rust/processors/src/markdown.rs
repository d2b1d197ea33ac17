//! Markdown to HTML conversion.

use std::path::Path;
use std::sync::LazyLock;

use comrak::Options as ComrakOptions;
use regex::Regex;
use serde::Deserialize;
use tracing::trace;

use holocron_core::{
    Condition, Constraint, Context, Processor, Schema, Stream, condition_constraint, parse_options,
    selective,
};
use holocron_shared::{HolocronError, Item, Options, Result, Value};

const NAME: &str = "markdown";

const EXTENSIONS: &[&str] = &[
    "table",
    "strikethrough",
    "autolink",
    "tasklist",
    "footnotes",
    "superscript",
];

/// A leading top-level heading, in either ATX (`# Title`) or setext
/// (`Title` underlined with `=`) form, followed by the rest of the content.
static TOP_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\n*(?:#([^\n#]+)|([^\n]+)\n=+[ \t]*(?:\n|$))\s*(.*)$").expect("valid regex")
});

/// Renders Markdown `content` to HTML and points `destination` at an
/// `.html` file.
///
/// A leading top-level heading is moved out of the content into `title`,
/// unless the item already has one (e.g. from front matter).
#[derive(Debug, Default, Clone, Copy)]
pub struct Markdown;

#[derive(Deserialize)]
struct MarkdownOptions {
    #[serde(default)]
    extensions: Vec<String>,
    when: Option<Condition>,
}

impl Processor for Markdown {
    fn schema(&self) -> Schema {
        Schema::new()
            .optional("extensions", Constraint::array(Constraint::Enum(EXTENSIONS)))
            .optional("when", condition_constraint())
    }

    fn process<'a>(
        &self,
        _cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let MarkdownOptions { extensions, when } = parse_options(NAME, options)?;
        let options = comrak_options(&extensions);

        Ok(selective(stream, when, move |item| render(item, &options)))
    }
}

fn comrak_options(extensions: &[String]) -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    for extension in extensions {
        match extension.as_str() {
            "table" => options.extension.table = true,
            "strikethrough" => options.extension.strikethrough = true,
            "autolink" => options.extension.autolink = true,
            "tasklist" => options.extension.tasklist = true,
            "footnotes" => options.extension.footnotes = true,
            "superscript" => options.extension.superscript = true,
            _ => {}
        }
    }
    options
}

fn render(mut item: Item, options: &ComrakOptions<'_>) -> Result<Item> {
    let content = item
        .get_str("content")
        .ok_or_else(|| HolocronError::processor(NAME, "item has no text 'content'"))?;

    let (title, body) = split_title(content);
    let html = comrak::markdown_to_html(body, options);
    let html = html.trim_end_matches('\n').to_string();

    if let Some(title) = title.map(str::to_string) {
        if !item.contains_key("title") {
            item.insert("title", title);
        }
    }
    item.insert("content", html);

    if let Some(destination) = item.get_str("destination") {
        let destination = Path::new(destination)
            .with_extension("html")
            .to_string_lossy()
            .into_owned();
        trace!(%destination, "rendered markdown");
        item.insert("destination", Value::String(destination));
    }

    Ok(item)
}

/// Split a leading top-level heading off `content`.
fn split_title(content: &str) -> (Option<&str>, &str) {
    match TOP_HEADING_RE.captures(content) {
        Some(caps) => {
            let heading = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim());
            let body = caps.get(3).map_or("", |m| m.as_str().trim());
            (heading, body)
        }
        None => (None, content),
    }
}
