//! Archive pages.

use serde::Deserialize;

use holocron_core::{Constraint, Context, Processor, Schema, Stream, parse_options};
use holocron_shared::{HolocronError, Item, Options, Result, Value};

const NAME: &str = "archive";

/// Passes every item through, then appends one archive page listing them.
///
/// The archive item carries `source = archive://<save_as>`, the target
/// `destination` and `template`, all upstream `items` and the site's
/// `baseurl` (the `url` metadata value, which must be set).
#[derive(Debug, Default, Clone, Copy)]
pub struct Archive;

#[derive(Deserialize)]
struct ArchiveOptions {
    #[serde(default = "default_template")]
    template: String,
    #[serde(default = "default_save_as")]
    save_as: String,
}

fn default_template() -> String {
    "archive.j2".into()
}

fn default_save_as() -> String {
    "index.html".into()
}

impl Processor for Archive {
    fn schema(&self) -> Schema {
        Schema::new()
            .optional("template", Constraint::String)
            .optional("save_as", Constraint::String)
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let ArchiveOptions { template, save_as } = parse_options(NAME, options)?;
        let baseurl = cx
            .metadata()
            .get("url")
            .cloned()
            .ok_or_else(|| HolocronError::processor(NAME, "site metadata has no 'url'"))?;

        let index = Item::from([
            ("source", Value::from(format!("archive://{save_as}"))),
            ("destination", Value::from(save_as)),
            ("template", Value::from(template)),
        ]);

        Ok(Box::new(Collect {
            upstream: stream,
            seen: Vec::new(),
            index: Some((index, Value::from(baseurl))),
        }))
    }
}

/// Re-emits upstream items while remembering them, then emits the archive.
struct Collect<'a> {
    upstream: Stream<'a>,
    seen: Vec<Item>,
    index: Option<(Item, Value)>,
}

impl Iterator for Collect<'_> {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.upstream.next() {
            Some(Ok(item)) => {
                self.seen.push(item.clone());
                Some(Ok(item))
            }
            Some(Err(e)) => Some(Err(e)),
            None => {
                let (mut index, baseurl) = self.index.take()?;
                let items = std::mem::take(&mut self.seen)
                    .into_iter()
                    .map(Value::Item)
                    .collect::<Vec<_>>();
                index.insert("items", items);
                index.insert("baseurl", baseurl);
                Some(Ok(index))
            }
        }
    }
}
