//! Error types for Holocron.
//!
//! Library crates use [`HolocronError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Holocron operations.
#[derive(Debug, thiserror::Error)]
pub enum HolocronError {
    /// A step references a processor name that is not registered.
    #[error("no such processor: '{name}'")]
    UnknownProcessor { name: String },

    /// A pipe name was invoked that is not registered.
    #[error("no such pipe: '{name}'")]
    UnknownPipe { name: String },

    /// A plugin reference could not be turned into a live processor.
    #[error("cannot resolve '{reference}': {message}")]
    Resolution { reference: String, message: String },

    /// Options supplied to a processor violate its declared schema.
    #[error("invalid option for '{processor}': field {field}: {message}")]
    InvalidOption {
        processor: String,
        field: String,
        message: String,
    },

    /// A pipe re-enters itself, directly or through other pipes.
    #[error("cyclic pipe: {}", trail.join(" -> "))]
    CyclicPipe { trail: Vec<String> },

    /// A processor failed while handling an item.
    #[error("{processor}: {message}")]
    Processor { processor: String, message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Machine-checkable classification of a [`HolocronError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownProcessor,
    UnknownPipe,
    Resolution,
    InvalidOption,
    CyclicPipe,
    Processor,
    Config,
    Io,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HolocronError>;

impl HolocronError {
    /// The kind of this error, without its payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownProcessor { .. } => ErrorKind::UnknownProcessor,
            Self::UnknownPipe { .. } => ErrorKind::UnknownPipe,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::InvalidOption { .. } => ErrorKind::InvalidOption,
            Self::CyclicPipe { .. } => ErrorKind::CyclicPipe,
            Self::Processor { .. } => ErrorKind::Processor,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Create an unknown-processor error.
    pub fn unknown_processor(name: impl Into<String>) -> Self {
        Self::UnknownProcessor { name: name.into() }
    }

    /// Create a resolution error for a plugin reference.
    pub fn resolution(reference: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Resolution {
            reference: reference.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid-option error attributed to `field` of `processor`.
    pub fn invalid_option(
        processor: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            processor: processor.into(),
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a per-item processor error.
    pub fn processor(processor: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Processor {
            processor: processor.into(),
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
