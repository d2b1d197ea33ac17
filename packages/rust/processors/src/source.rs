//! Reading items from the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace};

use holocron_core::{Constraint, Context, Processor, Schema, Stream, parse_options};
use holocron_shared::{HolocronError, Item, Options, Result, Value};

use crate::timezone::Timezone;

const NAME: &str = "source";

/// Yields the upstream items, then one item per file under `path`.
///
/// Files are visited depth first in sorted order, and only as the stream
/// is pulled. `pattern` filters on the path relative to `path`, matched
/// from its start. Each item gets `source` and `destination` (both the
/// relative path), `content` (text, or raw bytes for non-UTF-8 files),
/// and `created`/`updated` timestamps in `timezone`. Symlinked directories
/// are not descended into.
#[derive(Debug, Default, Clone, Copy)]
pub struct Source;

#[derive(Deserialize)]
struct SourceOptions {
    #[serde(default = "default_path")]
    path: PathBuf,
    pattern: Option<String>,
    timezone: Option<String>,
}

fn default_path() -> PathBuf {
    PathBuf::from(".")
}

impl Processor for Source {
    fn schema(&self) -> Schema {
        Schema::new()
            .optional("path", Constraint::String)
            .optional("pattern", Constraint::Regex)
            .optional("timezone", Constraint::String)
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let SourceOptions {
            path,
            pattern,
            timezone,
        } = parse_options(NAME, options)?;
        let timezone = Timezone::resolve(NAME, timezone, cx)?;
        let pattern = pattern
            .map(|p| Regex::new(&format!("^(?:{p})")))
            .transpose()
            .map_err(|e| HolocronError::invalid_option(NAME, "pattern", e.to_string()))?;

        debug!(path = %path.display(), %timezone, "reading sources");
        Ok(Box::new(stream.chain(Walk {
            pending: vec![path.clone()],
            root: path,
            pattern,
            timezone,
        })))
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Lazy, sorted, depth-first file walk.
struct Walk {
    root: PathBuf,
    /// Paths still to visit, next one last.
    pending: Vec<PathBuf>,
    pattern: Option<Regex>,
    timezone: Timezone,
}

/// What a walked path turns out to be.
enum Entry {
    Dir,
    File,
    /// A symlink to a directory.
    Skip,
}

impl Iterator for Walk {
    type Item = Result<Item>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.pending.pop() {
            let entry = match self.classify(&path) {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            match entry {
                Entry::Dir => {
                    if let Err(e) = self.descend(&path) {
                        return Some(Err(e));
                    }
                    continue;
                }
                Entry::Skip => {
                    trace!(path = %path.display(), "skipping symlinked directory");
                    continue;
                }
                Entry::File => {}
            }

            let source = relative(&self.root, &path);
            if self.pattern.as_ref().is_some_and(|re| !re.is_match(&source)) {
                continue;
            }
            trace!(%source, "found source");
            return Some(read_item(&path, source, self.timezone));
        }
        None
    }
}

impl Walk {
    /// The root is followed even when it is a symlink; nothing below it is.
    fn classify(&self, path: &Path) -> Result<Entry> {
        if *path == self.root {
            return Ok(if path.is_dir() { Entry::Dir } else { Entry::File });
        }

        let meta = fs::symlink_metadata(path).map_err(|e| HolocronError::io(path, e))?;
        Ok(if meta.is_dir() {
            Entry::Dir
        } else if meta.file_type().is_symlink() && path.is_dir() {
            Entry::Skip
        } else {
            Entry::File
        })
    }

    fn descend(&mut self, dir: &Path) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| HolocronError::io(dir, e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| HolocronError::io(dir, e))?;

        entries.sort();
        self.pending.extend(entries.into_iter().rev());
        Ok(())
    }
}

/// `path` relative to `root`, with `/` separators.
fn relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_item(path: &Path, source: String, timezone: Timezone) -> Result<Item> {
    let bytes = fs::read(path).map_err(|e| HolocronError::io(path, e))?;
    let meta = fs::metadata(path).map_err(|e| HolocronError::io(path, e))?;

    let updated = meta.modified().map_err(|e| HolocronError::io(path, e))?;
    let created = meta.created().unwrap_or(updated);

    let content = match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(e) => Value::Bytes(e.into_bytes()),
    };

    Ok(Item::from([
        ("source", Value::from(source.clone())),
        ("destination", Value::from(source)),
        ("content", content),
        ("created", Value::from(timezone.at(created))),
        ("updated", Value::from(timezone.at(updated))),
    ]))
}
