//! NSY-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Top-level error type for nagios_sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("[NSY-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[NSY-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[NSY-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[NSY-2001] cannot open inventory at {location}: {details}")]
    DataSourceConnect { location: String, details: String },

    #[error("[NSY-2002] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[NSY-2101] name resolution failed for {hostname}: {details}")]
    Resolution { hostname: String, details: String },

    #[error("[NSY-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[NSY-3002] atomic replace of {path} failed: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[NSY-3003] cannot set owner of {path}: {details}")]
    Ownership { path: PathBuf, details: String },

    #[error("[NSY-3101] restart command {command} could not be run: {details}")]
    RestartInvocation { command: PathBuf, details: String },

    #[error("[NSY-3201] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[NSY-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SyncError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "NSY-1001",
            Self::MissingConfig { .. } => "NSY-1002",
            Self::ConfigParse { .. } => "NSY-1003",
            Self::DataSourceConnect { .. } => "NSY-2001",
            Self::Sql { .. } => "NSY-2002",
            Self::Resolution { .. } => "NSY-2101",
            Self::Io { .. } => "NSY-3001",
            Self::Persist { .. } => "NSY-3002",
            Self::Ownership { .. } => "NSY-3003",
            Self::RestartInvocation { .. } => "NSY-3101",
            Self::Serialization { .. } => "NSY-3201",
            Self::Runtime { .. } => "NSY-3900",
        }
    }

    /// Whether the error aborts the whole run.
    ///
    /// Resolution failures are isolated to one device and restart failures
    /// are reported after the file is already in place.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Resolution { .. } | Self::RestartInvocation { .. }
        )
    }

    /// Process exit code for a run aborted by this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. } | Self::MissingConfig { .. } | Self::ConfigParse { .. } => 2,
            Self::DataSourceConnect { .. } | Self::Sql { .. } => 3,
            Self::Io { .. } | Self::Persist { .. } | Self::Ownership { .. } => 4,
            Self::Resolution { .. }
            | Self::RestartInvocation { .. }
            | Self::Serialization { .. }
            | Self::Runtime { .. } => 1,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
