//! Processors that are part of the engine itself rather than content
//! transformations.

mod import;
mod pipe;
mod when;

pub use import::ImportProcessors;
pub use pipe::Pipe;
pub use when::When;
