//! Publishing: scratch write, ownership, atomic replace, daemon restart.
//!
//! The scratch file lives in the target directory so the final step is a
//! same-filesystem rename. Mode and owner are set on the scratch file before
//! that rename, so the deployed file never exists with the wrong owner.
//! Until the rename succeeds the scratch file is owned by a
//! [`tempfile::NamedTempFile`] and removed on drop, so every failure path
//! leaves the deployed file untouched and no debris behind.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{error, info};

use super::render::RenderedConfig;
use crate::core::config::{CONFIG_FILE_NAME, Config};
use crate::core::errors::{Result, SyncError};
use crate::platform::pal::{Platform, RestartOutcome};

/// Permissions of the deployed file. Check commands carry SNMP communities.
#[cfg(unix)]
pub const DEPLOYED_MODE: u32 = 0o600;

/// What a publish did.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    /// Path of the replaced file.
    pub target: PathBuf,
    /// Size of the new contents.
    pub bytes_written: usize,
    /// `user:group` the file was handed to.
    pub owner: String,
    /// Present when the restart command ran, whatever its exit status.
    pub restart: Option<RestartOutcome>,
    /// Present when the restart command could not be started at all.
    pub restart_error: Option<String>,
}

impl DeployReport {
    /// Whether the daemon restart is known to have succeeded.
    #[must_use]
    pub fn restarted(&self) -> bool {
        self.restart.as_ref().is_some_and(|outcome| outcome.success)
    }
}

/// Replace the deployed file with `rendered`, hand it to the Nagios user,
/// and restart the daemon.
///
/// Write, ownership, and rename failures are fatal and leave the deployed
/// file as it was, so the next run sees a change and tries again. A failed
/// restart is logged and recorded in the report, never returned as an error.
pub fn publish(
    rendered: &RenderedConfig,
    config: &Config,
    platform: &dyn Platform,
) -> Result<DeployReport> {
    let target = config.target_path();
    let nagios = &config.nagios;
    write_atomically(rendered, &target, |scratch| {
        platform.set_owner(scratch, &nagios.user, &nagios.group)
    })?;
    let owner = format!("{}:{}", nagios.user, nagios.group);
    info!(path = %target.display(), bytes = rendered.len(), owner = %owner, "replaced deployed config");

    let mut report = DeployReport {
        target,
        bytes_written: rendered.len(),
        owner,
        restart: None,
        restart_error: None,
    };

    match platform.restart_daemon(&nagios.initd) {
        Ok(outcome) => {
            if outcome.success {
                info!(command = %outcome.command, "nagios restarted");
            } else {
                error!(
                    command = %outcome.command,
                    exit_code = ?outcome.exit_code,
                    output = %outcome.output.trim_end(),
                    "nagios restart reported failure"
                );
            }
            report.restart = Some(outcome);
        }
        Err(err) => {
            error!(error = %err, "nagios restart could not be run");
            report.restart_error = Some(err.to_string());
        }
    }

    Ok(report)
}

/// Write `rendered` next to `target`, hand the scratch file to `set_owner`,
/// and rename it into place.
pub fn write_atomically(
    rendered: &RenderedConfig,
    target: &Path,
    set_owner: impl FnOnce(&Path) -> Result<()>,
) -> Result<()> {
    let dir = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut scratch = tempfile::Builder::new()
        .prefix(&format!(".{CONFIG_FILE_NAME}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| SyncError::io(dir, err))?;

    write_scratch(&mut scratch, rendered).map_err(|err| SyncError::io(scratch.path(), err))?;
    set_owner(scratch.path())?;

    scratch
        .persist(target)
        .map_err(|err| SyncError::Persist {
            path: target.to_path_buf(),
            source: err.error,
        })?;
    Ok(())
}

fn write_scratch(scratch: &mut NamedTempFile, rendered: &RenderedConfig) -> std::io::Result<()> {
    scratch.write_all(rendered.as_bytes())?;
    scratch.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        scratch
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(DEPLOYED_MODE))?;
    }
    scratch.as_file().sync_all()
}
