//! nagsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use nagios_sync::cli_app::{Cli, run};
use nagios_sync::logger;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logger::init(&cli.log_level, cli.log_format) {
        eprintln!("nagsync: {err}");
        return ExitCode::from(2);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code(), "{err}");
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}
