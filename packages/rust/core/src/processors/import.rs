use serde::Deserialize;
use tracing::debug;

use holocron_shared::{Options, Result};

use crate::invoke::Context;
use crate::processor::{Processor, Stream, parse_options};
use crate::schema::{Constraint, Schema};

/// Registers processors from `"<name> = <location>"` references.
///
/// Registration happens while the step is threaded, before any item flows,
/// so later steps of the same invocation can use the imported names. The
/// stream itself passes through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportProcessors;

#[derive(Deserialize)]
struct ImportOptions {
    imports: Vec<String>,
}

impl Processor for ImportProcessors {
    fn schema(&self) -> Schema {
        Schema::new().required("imports", Constraint::array(Constraint::String))
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let ImportOptions { imports } = parse_options("import-processors", options)?;
        debug!(count = imports.len(), "importing processors");
        cx.app().import_processors(&imports)?;
        Ok(stream)
    }
}
