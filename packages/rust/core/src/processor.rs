//! The processor contract: a named transformation over a lazy stream of items.

use serde::de::DeserializeOwned;

use holocron_shared::{HolocronError, Item, Options, Result};

use crate::invoke::Context;
use crate::schema::Schema;

/// A lazy, finite, single-pass sequence of items.
///
/// Per-item failures travel inside the stream so that a processor can
/// report them without forcing its upstream.
pub type Stream<'a> = Box<dyn Iterator<Item = Result<Item>> + 'a>;

/// Wrap plain items into a [`Stream`].
pub fn from_items<'a, I>(items: I) -> Stream<'a>
where
    I: IntoIterator<Item = Item>,
    I::IntoIter: 'a,
{
    Box::new(items.into_iter().map(Ok))
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A unit of work that can be registered on an [`Application`](crate::Application)
/// and referenced by name from pipe steps.
///
/// `process` is called while the pipeline is being assembled, before any item
/// flows. Implementations must only wire up their output stream there and do
/// the per-item work when the stream is pulled.
pub trait Processor: Send + Sync {
    /// Options this processor accepts. Defaults to none.
    fn schema(&self) -> Schema {
        Schema::new()
    }

    /// Turn an input stream into an output stream. `options` have already
    /// been validated against [`Processor::schema`].
    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>>;
}

// ---------------------------------------------------------------------------
// Closure-backed processors
// ---------------------------------------------------------------------------

/// A processor backed by a plain function or closure.
pub struct FnProcessor<F> {
    func: F,
    schema: Schema,
}

/// Wrap a closure as a processor that accepts any options.
pub fn processor_fn<F>(func: F) -> FnProcessor<F>
where
    F: for<'a> Fn(&Context<'a>, Stream<'a>, Options) -> Result<Stream<'a>> + Send + Sync,
{
    FnProcessor {
        func,
        schema: Schema::new().allow_unknown(),
    }
}

impl<F> FnProcessor<F> {
    /// Replace the accepted-options schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }
}

impl<F> Processor for FnProcessor<F>
where
    F: for<'a> Fn(&Context<'a>, Stream<'a>, Options) -> Result<Stream<'a>> + Send + Sync,
{
    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        (self.func)(cx, stream, options)
    }
}

// ---------------------------------------------------------------------------
// Option parsing
// ---------------------------------------------------------------------------

/// Deserialize validated options into a typed struct.
pub fn parse_options<T: DeserializeOwned>(processor: &str, options: Options) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(options))
        .map_err(|e| HolocronError::invalid_option(processor, "options", e.to_string()))
}
