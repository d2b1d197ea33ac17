//! Site configuration for Holocron.
//!
//! Config lives in a TOML file (conventionally `_holocron.toml`) next to the
//! site sources. The literal `{here}` anywhere in the file expands to the
//! directory containing it, so pipes can refer to paths relative to the config.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HolocronError, Result};
use crate::types::{Metadata, Step};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "_holocron.toml";

/// Macro expanded to the config file's directory before parsing.
const HERE_MACRO: &str = "{here}";

// ---------------------------------------------------------------------------
// Config structs (matching _holocron.toml schema)
// ---------------------------------------------------------------------------

/// Top-level site config, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `[metadata]` section: site-wide values exposed read-only to processors.
    #[serde(default)]
    pub metadata: Metadata,

    /// Extra plugin references (`"name = location"`) layered on top of the
    /// built-in processors.
    #[serde(default)]
    pub imports: Vec<String>,

    /// `[pipes]` section: named, ordered step lists.
    #[serde(default)]
    pub pipes: BTreeMap<String, Vec<Step>>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the site config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| HolocronError::io(path, e))?;

    let here = path
        .canonicalize()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    parse_config(&content.replace(HERE_MACRO, &here.to_string_lossy())).map_err(|e| match e {
        HolocronError::Config { message } => {
            HolocronError::config(format!("failed to parse {}: {message}", path.display()))
        }
        other => other,
    })
}

/// Load the config from `path` if given, or from `CONFIG_FILE_NAME` in the
/// working directory if it exists. Falls back to defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config_from(path);
    }

    let default_path = Path::new(CONFIG_FILE_NAME);
    if !default_path.exists() {
        tracing::debug!(path = %default_path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(default_path)
}

/// Parse config text that has already had its macros expanded.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    toml::from_str(content).map_err(|e| HolocronError::config(e.to_string()))
}
