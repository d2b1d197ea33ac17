//! Resolution of `{"$ref": "metadata://#/<pointer>"}` values in step options.
//!
//! References are resolved at invocation time, right before validation, so
//! a pipe defined in configuration can pull site-wide values such as the
//! base URL. Anything that does not resolve is left as written.

use serde_json::Value;

use holocron_shared::{Metadata, Options};

const REF_KEY: &str = "$ref";
const METADATA_SCHEME: &str = "metadata://#";

/// Replace every resolvable reference in `options`, recursively.
pub fn resolve(options: Options, metadata: &Metadata) -> Options {
    options
        .into_iter()
        .map(|(key, value)| (key, resolve_value(value, metadata)))
        .collect()
}

fn resolve_value(value: Value, metadata: &Metadata) -> Value {
    match value {
        Value::Object(map) => match lookup(&map, metadata) {
            Some(resolved) => resolved,
            None => Value::Object(resolve(map, metadata)),
        },
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| resolve_value(item, metadata))
                .collect(),
        ),
        other => other,
    }
}

fn lookup(map: &Options, metadata: &Metadata) -> Option<Value> {
    if map.len() != 1 {
        return None;
    }
    let pointer = map.get(REF_KEY)?.as_str()?.strip_prefix(METADATA_SCHEME)?;

    // An empty pointer refers to the whole document.
    if pointer.is_empty() {
        return Some(Value::Object(metadata.clone()));
    }

    let (head, rest) = split_first_token(pointer)?;
    let root = metadata.get(&head)?;
    if rest.is_empty() {
        Some(root.clone())
    } else {
        root.pointer(rest).cloned()
    }
}

/// Split `/a/b/c` into the unescaped `a` and the remaining pointer `/b/c`.
fn split_first_token(pointer: &str) -> Option<(String, &str)> {
    let pointer = pointer.strip_prefix('/')?;
    let (token, rest) = match pointer.find('/') {
        Some(idx) => (&pointer[..idx], &pointer[idx..]),
        None => (pointer, ""),
    };
    Some((token.replace("~1", "/").replace("~0", "~"), rest))
}
