use serde::Deserialize;

use holocron_shared::{Options, Result, Step};

use crate::invoke::{Context, Target};
use crate::processor::{Processor, Stream, parse_options};
use crate::schema::{Constraint, Schema};

/// Threads the stream through another registered pipe, or through a list
/// of steps given inline.
///
/// Expansion goes through the invocation context, so a pipe that ends up
/// invoking itself fails with `CyclicPipe` instead of recursing. An empty
/// inline list passes the stream through.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pipe;

#[derive(Deserialize)]
struct PipeOptions {
    pipe: PipeTarget,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PipeTarget {
    Name(String),
    Steps(Vec<Step>),
}

impl From<PipeTarget> for Target {
    fn from(target: PipeTarget) -> Self {
        match target {
            PipeTarget::Name(name) => Target::Pipe(name),
            PipeTarget::Steps(steps) => Target::Steps(steps),
        }
    }
}

impl Processor for Pipe {
    fn schema(&self) -> Schema {
        let step = Schema::new()
            .required("name", Constraint::String)
            .allow_unknown();
        Schema::new().required(
            "pipe",
            Constraint::Either(vec![
                Constraint::String,
                Constraint::array(Constraint::Object(step)),
            ]),
        )
    }

    fn process<'a>(
        &self,
        cx: &Context<'a>,
        stream: Stream<'a>,
        options: Options,
    ) -> Result<Stream<'a>> {
        let PipeOptions { pipe } = parse_options("pipe", options)?;
        cx.invoke(pipe, stream)
    }
}
