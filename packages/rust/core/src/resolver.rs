//! Symbol resolution for plugin references.
//!
//! A reference has the form `"<name> = <location>"`. The location is a key
//! into a [`SymbolTable`] populated at process start with compiled-in
//! processor factories, e.g. `holocron_processors::markdown`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use holocron_shared::{HolocronError, Result};

use crate::processor::Processor;
use crate::processors::{ImportProcessors, Pipe, When};

/// Builds a fresh processor instance.
pub type Factory = fn() -> Arc<dyn Processor>;

/// Factory for any default-constructible processor.
pub fn factory<P: Processor + Default + 'static>() -> Arc<dyn Processor> {
    Arc::new(P::default())
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// A parsed `"<name> = <location>"` plugin reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Registry key the processor is registered under.
    pub name: String,
    /// Symbol table key of the implementation.
    pub location: String,
}

impl FromStr for Reference {
    type Err = HolocronError;

    fn from_str(s: &str) -> Result<Self> {
        static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)+$")
                .expect("valid regex")
        });

        let (name, location) = s
            .split_once('=')
            .ok_or_else(|| HolocronError::resolution(s, "expected '<name> = <location>'"))?;
        let (name, location) = (name.trim(), location.trim());

        if name.is_empty() {
            return Err(HolocronError::resolution(s, "processor name is empty"));
        }
        if !LOCATION_RE.is_match(location) {
            return Err(HolocronError::resolution(
                s,
                format!("malformed location '{location}', expected 'crate::symbol'"),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            location: location.to_string(),
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.location)
    }
}

// ---------------------------------------------------------------------------
// SymbolTable
// ---------------------------------------------------------------------------

/// Maps location strings to compiled-in processor factories.
#[derive(Clone, Default)]
pub struct SymbolTable {
    entries: BTreeMap<String, Factory>,
}

impl SymbolTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with the engine's own processors.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table
            .provide("holocron_core::pipe", factory::<Pipe>)
            .provide("holocron_core::when", factory::<When>)
            .provide("holocron_core::import_processors", factory::<ImportProcessors>);
        table
    }

    /// Make `factory` resolvable at `location`, replacing any previous entry.
    pub fn provide(&mut self, location: impl Into<String>, factory: Factory) -> &mut Self {
        self.entries.insert(location.into(), factory);
        self
    }

    /// Build the processor behind `location`.
    pub fn resolve(&self, location: &str) -> Option<Arc<dyn Processor>> {
        self.entries.get(location).map(|factory| factory())
    }

    /// All known locations, sorted.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference() {
        let r: Reference = "markdown = holocron_processors::markdown".parse().unwrap();
        assert_eq!(r.name, "markdown");
        assert_eq!(r.location, "holocron_processors::markdown");
        assert_eq!(r.to_string(), "markdown = holocron_processors::markdown");

        let r: Reference = "import-processors=holocron_core::import_processors".parse().unwrap();
        assert_eq!(r.name, "import-processors");
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in [
            "markdown",
            " = holocron_processors::markdown",
            "markdown = ",
            "markdown = holocron.processors.markdown:process",
            "markdown = markdown",
        ] {
            let err = bad.parse::<Reference>().unwrap_err();
            assert_eq!(err.kind(), holocron_shared::ErrorKind::Resolution, "{bad}");
        }
    }

    #[test]
    fn builtin_table_resolves_engine_processors() {
        let table = SymbolTable::builtin();
        assert!(table.resolve("holocron_core::pipe").is_some());
        assert!(table.resolve("holocron_core::when").is_some());
        assert!(table.resolve("holocron_core::import_processors").is_some());
        assert!(table.resolve("holocron_core::nope").is_none());
        assert_eq!(table.locations().count(), 3);
    }
}
