//! The application: processor and pipe registries plus site metadata.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, instrument, warn};

use holocron_shared::{HolocronError, Item, Metadata, Result, Step};

use crate::invoke::{Context, Target};
use crate::processor::{Processor, Stream, from_items};
use crate::resolver::{Reference, SymbolTable};

/// Owns everything one generation run needs: the processors it can call,
/// the pipes it knows, the plugin symbol table and read-only metadata.
///
/// Registries sit behind locks so that processors such as
/// `import-processors` can register while a pipeline is being assembled.
/// No lock is held while a processor runs.
pub struct Application {
    metadata: Metadata,
    symbols: SymbolTable,
    processors: RwLock<HashMap<String, Arc<dyn Processor>>>,
    pipes: RwLock<HashMap<String, Vec<Step>>>,
}

impl Application {
    /// An application with the engine's built-in symbol table and empty
    /// registries.
    pub fn new(metadata: Metadata) -> Self {
        Self::with_symbols(metadata, SymbolTable::builtin())
    }

    /// An application resolving plugin references against `symbols`.
    pub fn with_symbols(metadata: Metadata, symbols: SymbolTable) -> Self {
        Self {
            metadata,
            symbols,
            processors: RwLock::new(HashMap::new()),
            pipes: RwLock::new(HashMap::new()),
        }
    }

    /// Site-wide metadata visible to every processor.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The symbol table plugin references are resolved against.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    // -----------------------------------------------------------------------
    // Registries
    // -----------------------------------------------------------------------

    /// Register `processor` under `name`, replacing (with a warning) any
    /// processor already registered under that name.
    pub fn add_processor(&self, name: impl Into<String>, processor: Arc<dyn Processor>) {
        let name = name.into();
        let previous = self
            .processors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), processor);

        if previous.is_some() {
            warn!(processor = %name, "processor override");
        }
    }

    /// Register a named pipe, silently replacing one of the same name.
    pub fn add_pipe(&self, name: impl Into<String>, steps: Vec<Step>) {
        let name = name.into();
        let previous = self
            .pipes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), steps);

        if previous.is_some() {
            debug!(pipe = %name, "pipe override");
        }
    }

    /// Look up a registered processor.
    pub fn processor(&self, name: &str) -> Option<Arc<dyn Processor>> {
        self.processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Look up a registered pipe's steps.
    pub fn pipe(&self, name: &str) -> Option<Vec<Step>> {
        self.pipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered processor names, sorted.
    pub fn processor_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .processors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Registered pipe names, sorted.
    pub fn pipe_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .pipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    // -----------------------------------------------------------------------
    // Plugin loading
    // -----------------------------------------------------------------------

    /// Resolve each `"<name> = <location>"` reference and register the
    /// result, in order. Stops at the first failure; earlier entries stay
    /// registered.
    #[instrument(skip_all, fields(count = imports.len()))]
    pub fn import_processors<S: AsRef<str>>(&self, imports: &[S]) -> Result<()> {
        for import in imports {
            let import = import.as_ref();
            let reference: Reference = import.parse()?;
            let processor = self.symbols.resolve(&reference.location).ok_or_else(|| {
                HolocronError::resolution(
                    import,
                    format!("no processor at location '{}'", reference.location),
                )
            })?;
            debug!(%reference, "imported processor");
            self.add_processor(reference.name, processor);
        }
        info!(count = imports.len(), "processors imported");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Invocation
    // -----------------------------------------------------------------------

    /// Run `items` through `target`, a pipe name or a literal step list.
    ///
    /// Fails up front on unknown pipes or processors, invalid options and
    /// cyclic pipes. The returned stream is lazy: no item is produced or
    /// consumed until it is iterated.
    pub fn invoke<'a, I>(&'a self, target: impl Into<Target>, items: I) -> Result<Stream<'a>>
    where
        I: IntoIterator<Item = Item>,
        I::IntoIter: 'a,
    {
        self.invoke_stream(target, from_items(items))
    }

    /// Like [`Application::invoke`], for an already fallible stream.
    pub fn invoke_stream<'a>(
        &'a self,
        target: impl Into<Target>,
        stream: Stream<'a>,
    ) -> Result<Stream<'a>> {
        Context::new(self).invoke(target, stream)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("metadata", &self.metadata)
            .field("processors", &self.processor_names())
            .field("pipes", &self.pipe_names())
            .finish()
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(Metadata::new())
    }
}
