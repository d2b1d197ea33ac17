//! Threading a stream through a list of steps.
//!
//! An invocation walks the steps in order: look the processor up, resolve
//! option references, validate the options, then let the processor wrap the
//! current stream. Nothing is pulled from the stream here, so the returned
//! stream does all of its work on demand.

use tracing::{debug, instrument};

use holocron_shared::{HolocronError, Metadata, Result, Step};

use crate::application::Application;
use crate::processor::Stream;
use crate::refs;

/// What to invoke: a registered pipe or a literal list of steps.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Pipe(String),
    Steps(Vec<Step>),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Pipe(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Pipe(name)
    }
}

impl From<Vec<Step>> for Target {
    fn from(steps: Vec<Step>) -> Self {
        Self::Steps(steps)
    }
}

impl From<&[Step]> for Target {
    fn from(steps: &[Step]) -> Self {
        Self::Steps(steps.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What a processor sees of the invocation it runs in.
///
/// Besides the application, the context carries the trail of pipes being
/// expanded, so nested invocations can refuse to re-enter a pipe.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    app: &'a Application,
    trail: Vec<String>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: &'a Application) -> Self {
        Self {
            app,
            trail: Vec::new(),
        }
    }

    /// The application this invocation belongs to.
    pub fn app(&self) -> &'a Application {
        self.app
    }

    /// Site-wide metadata.
    pub fn metadata(&self) -> &'a Metadata {
        self.app.metadata()
    }

    /// Names of the pipes currently being expanded, outermost first.
    pub fn trail(&self) -> &[String] {
        &self.trail
    }

    /// Invoke `target` on `stream` as part of this invocation.
    ///
    /// This is how processors nest pipelines; a pipe that is already on the
    /// trail fails with [`HolocronError::CyclicPipe`].
    #[instrument(skip_all, fields(depth = self.trail.len()))]
    pub fn invoke(&self, target: impl Into<Target>, stream: Stream<'a>) -> Result<Stream<'a>> {
        let mut trail = self.trail.clone();

        let steps = match target.into() {
            Target::Steps(steps) => steps,
            Target::Pipe(name) => {
                if trail.contains(&name) {
                    trail.push(name);
                    return Err(HolocronError::CyclicPipe { trail });
                }
                let steps = self
                    .app
                    .pipe(&name)
                    .ok_or_else(|| HolocronError::UnknownPipe { name: name.clone() })?;
                trail.push(name);
                steps
            }
        };

        let cx = Context {
            app: self.app,
            trail,
        };

        steps
            .into_iter()
            .try_fold(stream, |stream, step| cx.thread(step, stream))
    }

    /// Wrap `stream` with a single step.
    fn thread(&self, step: Step, stream: Stream<'a>) -> Result<Stream<'a>> {
        let Step { name, options } = step;

        let processor = self
            .app
            .processor(&name)
            .ok_or_else(|| HolocronError::unknown_processor(&name))?;

        let options = refs::resolve(options, self.metadata());
        processor
            .schema()
            .validate(&options)
            .map_err(|v| HolocronError::invalid_option(&name, v.field, v.message))?;

        debug!(processor = %name, "threading step");
        processor.process(self, stream, options)
    }
}
