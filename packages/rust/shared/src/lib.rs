//! Shared types, error model, and configuration for Holocron.
//!
//! This crate is the foundation depended on by all other Holocron crates.
//! It provides:
//! - [`HolocronError`]: the unified error type
//! - Domain types ([`Item`], [`Value`], [`Step`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{AppConfig, CONFIG_FILE_NAME, load_config, load_config_from, parse_config};
pub use error::{ErrorKind, HolocronError, Result};
pub use types::{Item, Metadata, Options, Step, Value};
