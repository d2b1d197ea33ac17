//! Front matter extraction.

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use holocron_core::{
    Condition, Constraint, Context, Processor, Schema, Stream, condition_constraint, parse_options,
    selective,
};
use holocron_shared::{HolocronError, Item, Metadata, Options, Result, Value};

const NAME: &str = "frontmatter";

/// Moves a delimited header block at the top of `content` onto the item as
/// fields.
///
/// ```text
/// ---
/// title: Hello
/// tags: [jedi]
/// ---
/// body
/// ```
///
/// A header that fails to parse is logged and the item passes through
/// unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Frontmatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Format {
    Yaml,
    Json,
    Toml,
}

#[derive(Deserialize)]
struct FrontmatterOptions {
    #[serde(default = "default_delimiter")]
    delimiter: String,
    #[serde(default = "default_overwrite")]
    overwrite: bool,
    format: Option<Format>,
    when: Option<Condition>,
}

fn default_delimiter() -> String {
    "---".into()
}

fn default_overwrite() -> bool {
    true
}

impl Processor for Frontmatter {
    fn schema(&self) -> Schema {
        Schema::new()
            .optional("delimiter", Constraint::String)
            .optional("overwrite", Constraint::Bool)
            .optional("format", Constraint::Enum(&["yaml", "json", "toml"]))
            .optional("when", condition_constraint())
    }

    fn process<'a>(
        &self,
        _cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let FrontmatterOptions {
            delimiter,
            overwrite,
            format,
            when,
        } = parse_options(NAME, options)?;

        let delimiter = regex::escape(&delimiter);
        let block = Regex::new(&format!(
            r"(?s)^{delimiter}[ \t]*\n(.*?)\n{delimiter}[ \t]*(?:\n(.*))?$"
        ))
        .map_err(|e| HolocronError::invalid_option(NAME, "delimiter", e.to_string()))?;

        Ok(selective(stream, when, move |item| {
            Ok(extract(item, &block, format, overwrite))
        }))
    }
}

fn extract(mut item: Item, block: &Regex, format: Option<Format>, overwrite: bool) -> Item {
    let Some(content) = item.get_str("content") else {
        return item;
    };
    let Some(caps) = block.captures(content) else {
        return item;
    };

    let header = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str()).to_string();

    let fields = match parse_header(header, format) {
        Ok(fields) => fields,
        Err(reason) => {
            warn!(
                source = item.get_str("source").unwrap_or("<unknown>"),
                %reason,
                "skipping malformed front matter"
            );
            return item;
        }
    };

    item.insert("content", body);
    for (key, value) in fields {
        if overwrite || !item.contains_key(&key) {
            item.insert(key, Value::from(value));
        }
    }
    item
}

/// Parse a header block into a mapping. Without an explicit format, JSON,
/// TOML and YAML are tried in that order.
fn parse_header(header: &str, format: Option<Format>) -> std::result::Result<Metadata, String> {
    let formats: &[Format] = match &format {
        Some(format) => std::slice::from_ref(format),
        None => &[Format::Json, Format::Toml, Format::Yaml],
    };

    let mut last_error = String::new();
    for format in formats {
        let parsed = match format {
            Format::Json => {
                serde_json::from_str::<serde_json::Value>(header).map_err(|e| e.to_string())
            }
            Format::Toml => toml::from_str::<serde_json::Value>(header).map_err(|e| e.to_string()),
            Format::Yaml => {
                serde_yaml::from_str::<serde_json::Value>(header).map_err(|e| e.to_string())
            }
        };
        match parsed {
            Ok(serde_json::Value::Object(map)) => return Ok(map),
            // An empty YAML document.
            Ok(serde_json::Value::Null) => return Ok(Metadata::new()),
            Ok(_) => last_error = "front matter is not a mapping".into(),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}
