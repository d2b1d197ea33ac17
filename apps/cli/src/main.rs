//! Holocron CLI: run content pipelines defined in a site config.
//!
//! Loads `_holocron.toml`, bootstraps an application with every built-in
//! processor, and invokes the requested pipe.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
