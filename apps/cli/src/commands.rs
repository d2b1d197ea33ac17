//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{error, info};

use holocron_processors::create_app;
use holocron_shared::{AppConfig, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Holocron, a pipeline-driven static site generator.
#[derive(Parser)]
#[command(
    name = "holocron",
    version,
    about = "Run content pipelines defined in a Holocron site config.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to the site config (defaults to ./_holocron.toml if present).
    #[arg(short, long, env = "HOLOCRON_CONF", global = true)]
    pub conf: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Invoke a pipe and drain its output.
    Run {
        /// Name of the pipe to run.
        pipe: String,

        /// Keep going after an item fails instead of stopping.
        #[arg(long)]
        keep_going: bool,
    },

    /// List registered processors.
    Processors,

    /// List configured pipes and their steps.
    Pipes,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "holocron=info",
        1 => "holocron=debug",
        _ => "holocron=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.conf.as_deref()).wrap_err("failed to load site config")?;

    match cli.command {
        Command::Run { pipe, keep_going } => cmd_run(&config, &pipe, keep_going),
        Command::Processors => cmd_processors(&config),
        Command::Pipes => cmd_pipes(&config),
        Command::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_run(config: &AppConfig, pipe: &str, keep_going: bool) -> Result<()> {
    let app = create_app(config)?;
    let stream = app
        .invoke(pipe, Vec::new())
        .wrap_err_with(|| format!("cannot run pipe '{pipe}'"))?;

    let (mut done, mut failed) = (0usize, 0usize);
    for item in stream {
        match item {
            Ok(_) => done += 1,
            Err(e) if keep_going => {
                error!(error = %e, "item failed");
                failed += 1;
            }
            Err(e) => return Err(e).wrap_err_with(|| format!("pipe '{pipe}' failed")),
        }
    }

    info!(pipe, items = done, failed, "pipe finished");
    println!("{pipe}: {done} item(s) processed, {failed} failed");
    Ok(())
}

fn cmd_processors(config: &AppConfig) -> Result<()> {
    let app = create_app(config)?;
    for name in app.processor_names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_pipes(config: &AppConfig) -> Result<()> {
    if config.pipes.is_empty() {
        println!("No pipes configured.");
        return Ok(());
    }

    for (name, steps) in &config.pipes {
        let chain: Vec<_> = steps.iter().map(|step| step.name.as_str()).collect();
        println!("{name}: {}", chain.join(" -> "));
    }
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
