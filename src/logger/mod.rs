//! Log sink wiring for the binary.
//!
//! Library code only emits `tracing` events; which subscriber receives them
//! is decided here, once, at startup. Events go to stderr so that `render`
//! output on stdout stays clean.

use tracing_subscriber::EnvFilter;

use crate::core::errors::{Result, SyncError};

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum LogFormat {
    /// Human-readable single lines.
    #[default]
    Text,
    /// One JSON object per line, for syslog/journald shippers.
    Json,
}

/// Build the level filter. `RUST_LOG` wins over `level` when set.
pub fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| SyncError::InvalidConfig {
            details: format!("invalid log level {level:?}: {err}"),
        })
}

/// Install the global subscriber.
pub fn init(level: &str, format: LogFormat) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| SyncError::Runtime {
        details: format!("cannot install log subscriber: {err}"),
    })
}
