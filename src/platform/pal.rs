//! Platform abstraction layer: the operating-system collaborators of a run.
//!
//! Name resolution, file ownership, and daemon control are the only places
//! the pipeline touches the host beyond plain file IO. Keeping them behind
//! [`Platform`] lets tests drive the full pipeline without DNS, root
//! privileges, or a running Nagios.

#![allow(missing_docs)]

use std::net::{IpAddr, ToSocketAddrs};
use std::path::Path;
use std::process::Command;

use serde::Serialize;

use crate::core::errors::{Result, SyncError};

/// Result of invoking the daemon control script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestartOutcome {
    pub command: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Combined stdout and stderr.
    pub output: String,
}

pub trait Platform {
    /// Resolve a host name to one network address.
    fn resolve(&self, hostname: &str) -> Result<IpAddr>;
    /// Set the owning user and group of `path`.
    fn set_owner(&self, path: &Path, user: &str, group: &str) -> Result<()>;
    /// Run `init_script restart`.
    ///
    /// A script that runs and exits non-zero is an `Ok` outcome with
    /// `success == false`; only failing to start it is an error.
    fn restart_daemon(&self, init_script: &Path) -> Result<RestartOutcome>;
}

/// The running host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPlatform;

impl Platform for SystemPlatform {
    fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        let mut addrs = (hostname, 0_u16)
            .to_socket_addrs()
            .map_err(|err| SyncError::Resolution {
                hostname: hostname.to_string(),
                details: err.to_string(),
            })?;
        addrs
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| SyncError::Resolution {
                hostname: hostname.to_string(),
                details: "resolver returned no addresses".to_string(),
            })
    }

    #[cfg(unix)]
    fn set_owner(&self, path: &Path, user: &str, group: &str) -> Result<()> {
        use nix::unistd::{Group, User, chown};

        let ownership_error = |details: String| SyncError::Ownership {
            path: path.to_path_buf(),
            details,
        };

        let uid = User::from_name(user)
            .map_err(|err| ownership_error(format!("user lookup for {user}: {err}")))?
            .ok_or_else(|| ownership_error(format!("unknown user {user}")))?
            .uid;
        let gid = Group::from_name(group)
            .map_err(|err| ownership_error(format!("group lookup for {group}: {err}")))?
            .ok_or_else(|| ownership_error(format!("unknown group {group}")))?
            .gid;

        chown(path, Some(uid), Some(gid)).map_err(|err| ownership_error(err.to_string()))
    }

    #[cfg(not(unix))]
    fn set_owner(&self, path: &Path, _user: &str, _group: &str) -> Result<()> {
        Err(SyncError::Ownership {
            path: path.to_path_buf(),
            details: "file ownership is only supported on unix".to_string(),
        })
    }

    fn restart_daemon(&self, init_script: &Path) -> Result<RestartOutcome> {
        let output = Command::new(init_script)
            .arg("restart")
            .output()
            .map_err(|err| SyncError::RestartInvocation {
                command: init_script.to_path_buf(),
                details: err.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(RestartOutcome {
            command: format!("{} restart", init_script.display()),
            exit_code: output.status.code(),
            success: output.status.success(),
            output: combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn localhost_resolves() {
        let addr = SystemPlatform.resolve("localhost").expect("localhost resolves");
        assert!(addr.is_loopback());
    }

    #[test]
    fn invalid_name_fails_resolution() {
        let err = SystemPlatform
            .resolve("no-such-host.invalid")
            .expect_err(".invalid never resolves");
        assert!(matches!(err, SyncError::Resolution { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_restart_script_is_an_invocation_error() {
        let tmp = TempDir::new().unwrap();
        let err = SystemPlatform
            .restart_daemon(&tmp.path().join("nagios"))
            .expect_err("script does not exist");
        assert_eq!(err.code(), "NSY-3101");
    }

    #[cfg(unix)]
    #[test]
    fn restart_captures_output_and_status() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("nagios");
        std::fs::write(
            &script,
            "#!/bin/sh\necho \"Restarting nagios: $1\"\necho warn >&2\nexit 3\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = SystemPlatform.restart_daemon(&script).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.output.contains("Restarting nagios: restart"));
        assert!(outcome.output.contains("warn"));
    }

    #[cfg(unix)]
    #[test]
    fn unknown_owner_is_an_ownership_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.cfg");
        std::fs::write(&path, "x").unwrap();
        let err = SystemPlatform
            .set_owner(&path, "nagsync-no-such-user", "nagsync-no-such-group")
            .unwrap_err();
        assert_eq!(err.code(), "NSY-3003");
    }
}
