//! The Holocron pipeline engine.
//!
//! An [`Application`] holds named processors and pipes. [`Application::invoke`]
//! threads a lazy stream of items through a pipe (or a literal list of
//! steps), validating every step's options before any processor body runs.
//! Pipes nest through the `pipe` processor, and `when` routes a subset of
//! the stream through another processor.

pub mod application;
pub mod invoke;
pub mod processor;
pub mod processors;
pub mod refs;
pub mod resolver;
pub mod schema;
pub mod when;

pub use application::Application;
pub use invoke::{Context, Target};
pub use processor::{FnProcessor, Processor, Stream, from_items, parse_options, processor_fn};
pub use processors::{ImportProcessors, Pipe, When};
pub use resolver::{Factory, Reference, SymbolTable, factory};
pub use schema::{Constraint, Schema, Violation};
pub use when::{Clause, Condition, condition_constraint, is_selected, selective};
