//! Setting fixed fields on items.

use serde::Deserialize;

use holocron_core::{
    Condition, Constraint, Context, Processor, Schema, Stream, condition_constraint, parse_options,
    selective,
};
use holocron_shared::{Metadata, Options, Result, Value};

const NAME: &str = "metadata";

/// Sets the given fields on every selected item.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetMetadata;

#[derive(Deserialize)]
struct MetadataOptions {
    metadata: Metadata,
    #[serde(default = "default_overwrite")]
    overwrite: bool,
    when: Option<Condition>,
}

fn default_overwrite() -> bool {
    true
}

impl Processor for SetMetadata {
    fn schema(&self) -> Schema {
        Schema::new()
            .required("metadata", Constraint::map(Constraint::Any))
            .optional("overwrite", Constraint::Bool)
            .optional("when", condition_constraint())
    }

    fn process<'a>(
        &self,
        _cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let MetadataOptions {
            metadata,
            overwrite,
            when,
        } = parse_options(NAME, options)?;

        Ok(selective(stream, when, move |mut item| {
            for (key, value) in &metadata {
                if overwrite || !item.contains_key(key) {
                    item.insert(key.clone(), Value::from(value.clone()));
                }
            }
            Ok(item)
        }))
    }
}
