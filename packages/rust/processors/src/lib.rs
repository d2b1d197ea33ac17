//! Content processors for Holocron and the application bootstrap.
//!
//! Each processor is a small transformation over the item stream, plugged
//! into the engine through [`holocron_core::Processor`]. [`create_app`]
//! builds an application with all of them registered under their canonical
//! names, plus whatever the configuration adds.

mod archive;
mod frontmatter;
mod markdown;
mod metadata;
mod prettyuri;
mod save;
mod source;
mod timezone;
mod todatetime;

use tracing::{info, instrument};

use holocron_core::{Application, SymbolTable, factory};
use holocron_shared::{AppConfig, Result};

pub use archive::Archive;
pub use frontmatter::Frontmatter;
pub use markdown::Markdown;
pub use metadata::SetMetadata;
pub use prettyuri::PrettyUri;
pub use save::Save;
pub use source::Source;
pub use timezone::Timezone;
pub use todatetime::ToDateTime;

/// Plugin references for every processor shipped with Holocron.
pub const BUILTINS: &[&str] = &[
    "archive = holocron_processors::archive",
    "frontmatter = holocron_processors::frontmatter",
    "import-processors = holocron_core::import_processors",
    "markdown = holocron_processors::markdown",
    "metadata = holocron_processors::metadata",
    "pipe = holocron_core::pipe",
    "prettyuri = holocron_processors::prettyuri",
    "save = holocron_processors::save",
    "source = holocron_processors::source",
    "todatetime = holocron_processors::todatetime",
    "when = holocron_core::when",
];

/// The engine's symbol table extended with this crate's processors.
pub fn symbols() -> SymbolTable {
    let mut table = SymbolTable::builtin();
    table
        .provide("holocron_processors::archive", factory::<Archive>)
        .provide("holocron_processors::frontmatter", factory::<Frontmatter>)
        .provide("holocron_processors::markdown", factory::<Markdown>)
        .provide("holocron_processors::metadata", factory::<SetMetadata>)
        .provide("holocron_processors::prettyuri", factory::<PrettyUri>)
        .provide("holocron_processors::save", factory::<Save>)
        .provide("holocron_processors::source", factory::<Source>)
        .provide("holocron_processors::todatetime", factory::<ToDateTime>);
    table
}

/// Build an application from configuration, resolving plugins against
/// [`symbols`].
pub fn create_app(config: &AppConfig) -> Result<Application> {
    create_app_with(config, symbols())
}

/// Build an application from configuration with a custom symbol table.
///
/// Registers [`BUILTINS`] first, then the configured imports (which may
/// override built-ins), then the configured pipes.
#[instrument(skip_all, fields(imports = config.imports.len(), pipes = config.pipes.len()))]
pub fn create_app_with(config: &AppConfig, symbols: SymbolTable) -> Result<Application> {
    let app = Application::with_symbols(config.metadata.clone(), symbols);

    app.import_processors(BUILTINS)?;
    app.import_processors(&config.imports)?;

    for (name, steps) in &config.pipes {
        app.add_pipe(name.clone(), steps.clone());
    }

    info!(
        processors = app.processor_names().len(),
        pipes = app.pipe_names().len(),
        "application ready"
    );
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use holocron_shared::{ErrorKind, parse_config};

    #[test]
    fn builtins_resolve_against_symbols() {
        let app = create_app(&AppConfig::default()).unwrap();
        assert_eq!(
            app.processor_names(),
            [
                "archive",
                "frontmatter",
                "import-processors",
                "markdown",
                "metadata",
                "pipe",
                "prettyuri",
                "save",
                "source",
                "todatetime",
                "when",
            ]
        );
        assert!(app.pipe_names().is_empty());
    }

    #[test]
    fn config_imports_and_pipes_are_registered() {
        let config = parse_config(
            r#"
            imports = ["commonmark = holocron_processors::markdown"]

            [metadata]
            url = "https://yoda.ua"

            [pipes]
            compile = [
              { name = "source", pattern = ".*\\.md$" },
              { name = "commonmark" },
            ]
            "#,
        )
        .unwrap();

        let app = create_app(&config).unwrap();
        assert!(app.processor("commonmark").is_some());
        assert_eq!(app.pipe_names(), ["compile"]);
        assert_eq!(app.pipe("compile").unwrap().len(), 2);
        assert_eq!(app.metadata()["url"], "https://yoda.ua");
    }

    #[test]
    fn bad_config_import_fails() {
        let config = parse_config(r#"imports = ["broken"]"#).unwrap();
        let err = create_app(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }
}
