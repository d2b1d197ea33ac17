//! Parsing date/time strings on items.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;

use holocron_core::{Constraint, Context, Processor, Schema, Stream, parse_options};
use holocron_shared::{HolocronError, Item, Options, Result, Value};

use crate::timezone::Timezone;

const NAME: &str = "todatetime";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Converts a string field into a date/time value.
///
/// `todatetime` names the field to convert in place, or a `[from, to]`
/// pair to read one field and write another. `parsearea` narrows the text
/// first (its first match anywhere in the field is parsed), which helps
/// when the date is embedded in something like a file name. Values without
/// an offset are read in `timezone`, which falls back to the site's
/// `timezone` metadata and then to UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToDateTime;

#[derive(Deserialize)]
#[serde(untagged)]
enum Fields {
    Same(String),
    Pair(String, String),
}

#[derive(Deserialize)]
struct ToDateTimeOptions {
    todatetime: Fields,
    parsearea: Option<String>,
    timezone: Option<String>,
}

impl Processor for ToDateTime {
    fn schema(&self) -> Schema {
        Schema::new()
            .required(
                "todatetime",
                Constraint::Either(vec![
                    Constraint::String,
                    Constraint::Tuple(vec![Constraint::String, Constraint::String]),
                ]),
            )
            .optional("parsearea", Constraint::Regex)
            .optional("timezone", Constraint::String)
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let ToDateTimeOptions {
            todatetime,
            parsearea,
            timezone,
        } = parse_options(NAME, options)?;
        let timezone = Timezone::resolve(NAME, timezone, cx)?;
        let (from, to) = match todatetime {
            Fields::Same(field) => (field.clone(), field),
            Fields::Pair(from, to) => (from, to),
        };
        let parsearea = Regex::new(parsearea.as_deref().unwrap_or(".*"))
            .map_err(|e| HolocronError::invalid_option(NAME, "parsearea", e.to_string()))?;

        Ok(Box::new(stream.map(move |item| {
            convert(item?, &from, &to, &parsearea, timezone)
        })))
    }
}

fn convert(
    mut item: Item,
    from: &str,
    to: &str,
    parsearea: &Regex,
    timezone: Timezone,
) -> Result<Item> {
    let text = match item.get(from) {
        Some(Value::DateTime(dt)) => {
            let dt = *dt;
            item.insert(to, dt);
            return Ok(item);
        }
        Some(value) => value.to_string(),
        None => {
            return Err(HolocronError::processor(
                NAME,
                format!("item has no '{from}' field"),
            ));
        }
    };

    let area = parsearea.find(&text).ok_or_else(|| {
        HolocronError::processor(
            NAME,
            format!("'{text}' in '{from}' has no match for '{}'", parsearea.as_str()),
        )
    })?;

    let parsed = parse(area.as_str().trim(), timezone).ok_or_else(|| {
        HolocronError::processor(NAME, format!("cannot parse '{}' as a date/time", area.as_str()))
    })?;
    item.insert(to, parsed);
    Ok(item)
}

/// RFC 3339, or a naive `YYYY-MM-DD[ HH:MM[:SS]]` read in `timezone`.
fn parse(text: &str, timezone: Timezone) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    timezone.localize(naive)
}
