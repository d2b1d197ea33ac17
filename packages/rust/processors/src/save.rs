//! Writing items to disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use holocron_core::{Constraint, Context, Processor, Schema, Stream, parse_options};
use holocron_shared::{HolocronError, Item, Options, Result, Value};

const NAME: &str = "save";

/// Writes each item's `content` to `<to>/<destination>` and passes the
/// item on.
#[derive(Debug, Default, Clone, Copy)]
pub struct Save;

#[derive(Deserialize)]
struct SaveOptions {
    #[serde(default = "default_to")]
    to: PathBuf,
}

fn default_to() -> PathBuf {
    PathBuf::from("_site")
}

impl Processor for Save {
    fn schema(&self) -> Schema {
        Schema::new().optional("to", Constraint::String)
    }

    fn process<'a>(
        &self,
        _cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let SaveOptions { to } = parse_options(NAME, options)?;
        Ok(Box::new(stream.map(move |item| {
            let item = item?;
            write_item(&to, &item)?;
            Ok(item)
        })))
    }
}

fn write_item(to: &Path, item: &Item) -> Result<()> {
    let destination = item
        .get_str("destination")
        .ok_or_else(|| HolocronError::processor(NAME, "item has no 'destination'"))?;

    let bytes = match item.get("content") {
        Some(Value::String(text)) => text.as_bytes(),
        Some(Value::Bytes(bytes)) => bytes.as_slice(),
        Some(_) => {
            return Err(HolocronError::processor(
                NAME,
                format!("content of '{destination}' is neither text nor bytes"),
            ));
        }
        None => &[],
    };

    let target = to.join(destination);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| HolocronError::io(parent, e))?;
    }
    fs::write(&target, bytes).map_err(|e| HolocronError::io(&target, e))?;

    debug!(path = %target.display(), bytes = bytes.len(), "saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use holocron_core::Application;
    use holocron_shared::{ErrorKind, Step};

    fn run(to: &Path, items: Vec<Item>) -> Vec<Result<Item>> {
        let app = Application::default();
        app.add_processor(NAME, Arc::new(Save));
        app.invoke(vec![Step::new(NAME).option("to", to.to_str().unwrap())], items)
            .unwrap()
            .collect()
    }

    #[test]
    fn writes_text_and_bytes() {
        let dir = TempDir::new().unwrap();
        let items = vec![
            Item::from([
                ("content", Value::from("<p>eh</p>")),
                ("destination", Value::from("posts/1.html")),
            ]),
            Item::from([
                ("content", Value::Bytes(vec![0, 159, 146, 150])),
                ("destination", Value::from("logo.png")),
            ]),
        ];

        let out = run(dir.path(), items.clone());
        let out: Vec<Item> = out.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(out, items);

        assert_eq!(fs::read_to_string(dir.path().join("posts/1.html")).unwrap(), "<p>eh</p>");
        assert_eq!(fs::read(dir.path().join("logo.png")).unwrap(), [0_u8, 159, 146, 150]);
    }

    #[test]
    fn nothing_is_written_until_pulled() {
        let dir = TempDir::new().unwrap();
        let app = Application::default();
        app.add_processor(NAME, Arc::new(Save));

        let stream = app
            .invoke(
                vec![Step::new(NAME).option("to", dir.path().to_str().unwrap())],
                [Item::from([("content", "eh"), ("destination", "a.txt")])],
            )
            .unwrap();
        assert!(!dir.path().join("a.txt").exists());

        drop(stream.collect::<Vec<_>>());
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn missing_destination_is_an_item_error() {
        let dir = TempDir::new().unwrap();
        let out = run(dir.path(), vec![Item::from([("content", "eh")])]);
        let err = out.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processor);
    }
}
