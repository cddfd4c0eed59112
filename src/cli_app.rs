//! Top-level CLI definition and dispatch.

use std::io::Write as _;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::info;

use crate::core::config::{Config, DEFAULT_SETTINGS_PATH, EXAMPLE_SETTINGS};
use crate::core::errors::{Result, SyncError};
use crate::inventory::sqlite::SqliteInventory;
use crate::logger::LogFormat;
use crate::platform::pal::SystemPlatform;
use crate::reconcile::pipeline::{self, RunMode, RunReport};

/// nagsync — publishes a Nagios host/service config derived from Observium.
#[derive(Debug, Parser)]
#[command(name = "nagsync", version, about)]
pub struct Cli {
    /// Settings file.
    #[arg(
        short,
        long,
        global = true,
        env = "NAGSYNC_CONFIG",
        default_value = DEFAULT_SETTINGS_PATH
    )]
    pub config: PathBuf,

    /// Log level or filter directive; RUST_LOG takes precedence.
    #[arg(long, global = true, env = "NAGSYNC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log line encoding.
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Print the run report as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Regenerate the config and publish it if it changed (restarts Nagios).
    Run,
    /// Report whether the config would change, without writing anything.
    Check,
    /// Print the generated config to stdout.
    Render,
    /// Print a complete example settings file.
    ExampleConfig,
    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Dispatch CLI commands.
///
/// # Errors
/// Returns the fatal error that aborted the run.
pub fn run(cli: &Cli) -> Result<()> {
    let mode = match &cli.command {
        Command::ExampleConfig => {
            print!("{EXAMPLE_SETTINGS}");
            return Ok(());
        }
        Command::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "nagsync",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        Command::Run => RunMode::Publish,
        Command::Check => RunMode::Check,
        Command::Render => RunMode::Render,
    };

    let config = Config::load(&cli.config)?;
    info!(path = %config.inventory.database.display(), "connecting to inventory");
    let inventory = SqliteInventory::open(&config.inventory.database)?;
    info!("connected to inventory");

    let report = pipeline::run(&config, &inventory, &SystemPlatform, mode)?;
    emit(&report, cli.json)
}

fn emit(report: &RunReport, json: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    let written = match (&report.rendered, json) {
        (Some(rendered), _) => stdout.write_all(rendered.as_bytes()),
        (None, true) => {
            let payload = serde_json::to_string_pretty(report)?;
            writeln!(stdout, "{payload}")
        }
        (None, false) => stdout.write_all(pipeline::format_run_report(report).as_bytes()),
    };
    written.map_err(|err| SyncError::Runtime {
        details: format!("cannot write to stdout: {err}"),
    })
}
