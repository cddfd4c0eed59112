//! Shared fixtures for integration tests: an on-disk Observium inventory,
//! a settings file pointing at a scratch conf.d, and a fake init script.

#![allow(dead_code, missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use rusqlite::Connection;
use tempfile::TempDir;

pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

/// Run the `nagsync` binary and keep a per-case log under the target tmpdir.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CliResult {
    let output = Command::new(env!("CARGO_BIN_EXE_nagsync"))
        .args(args)
        .env_remove("NAGSYNC_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn nagsync");

    let log_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("cli-logs");
    fs::create_dir_all(&log_dir).expect("create log dir");
    let log_path = log_dir.join(format!("{case_name}.log"));

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    fs::write(
        &log_path,
        format!(
            "args: {args:?}\nstatus: {:?}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
            output.status.code()
        ),
    )
    .expect("write case log");

    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub const SCHEMA: &str = "
CREATE TABLE devices (device_id INTEGER PRIMARY KEY, hostname TEXT, community TEXT, os TEXT);
CREATE TABLE ports (port_id INTEGER PRIMARY KEY, device_id INTEGER, ifAlias TEXT);
CREATE TABLE links (id INTEGER PRIMARY KEY, local_port_id INTEGER, remote_hostname TEXT);
";

/// Self-contained deployment: database, conf.d, init script, settings.
pub struct Fixture {
    pub dir: TempDir,
    pub database: PathBuf,
    pub confd: PathBuf,
    pub initd: PathBuf,
    pub restart_log: PathBuf,
    pub settings: PathBuf,
}

impl Fixture {
    /// Devices `localhost` (ios) and `127.0.0.1` (ios), which resolve
    /// without DNS, plus `switch-b.invalid`, which never resolves. Links run
    /// from localhost to the other two.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let database = dir.path().join("observium.sqlite3");
        let confd = dir.path().join("conf.d");
        let initd = dir.path().join("nagios-init");
        let restart_log = dir.path().join("restarts.log");
        let settings = dir.path().join("settings.toml");
        fs::create_dir_all(&confd).unwrap();

        let conn = Connection::open(&database).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO devices VALUES (1, 'LocalHost', 'pub', 'IOS');
             INSERT INTO devices VALUES (2, '127.0.0.1', 'pub', 'ios');
             INSERT INTO devices VALUES (3, 'switch-b.invalid', 'pub', 'ios');
             INSERT INTO ports VALUES (10, 1, 'uplink');
             INSERT INTO ports VALUES (11, 1, 'to switch-b');
             INSERT INTO links VALUES (100, 10, '127.0.0.1');
             INSERT INTO links VALUES (101, 11, 'switch-b.invalid');",
        )
        .unwrap();
        drop(conn);

        write_script(
            &initd,
            &format!("#!/bin/sh\necho \"$1\" >> '{}'\necho 'Restarting nagios'\n", restart_log.display()),
        );

        let (user, group) = current_identity();
        fs::write(
            &settings,
            format!(
                r#"[inventory]
database = "{database}"

[web]
base_url = "https://observium.example.com"

[nagios]
confd = "{confd}"
binary = "/usr/sbin/nagios"
initd = "{initd}"
host_template = "observium-host"
host_dependency = true
user = "{user}"
group = "{group}"

[checks]
ios = ["check-cpu", {{ name = "check-if", community = true }}]
"#,
                database = database.display(),
                confd = confd.display(),
                initd = initd.display(),
            ),
        )
        .unwrap();

        Self {
            dir,
            database,
            confd,
            initd,
            restart_log,
            settings,
        }
    }

    pub fn target(&self) -> PathBuf {
        self.confd.join(nagios_sync::core::config::CONFIG_FILE_NAME)
    }

    pub fn settings_arg(&self) -> &str {
        self.settings.to_str().expect("utf-8 path")
    }

    pub fn restart_count(&self) -> usize {
        fs::read_to_string(&self.restart_log)
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    pub fn add_device(&self, id: i64, hostname: &str, os: &str) {
        let conn = Connection::open(&self.database).unwrap();
        conn.execute(
            "INSERT INTO devices VALUES (?1, ?2, 'pub', ?3)",
            rusqlite::params![id, hostname, os],
        )
        .unwrap();
    }
}

fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Names of the invoking user and primary group; chown to them needs no
/// privileges.
pub fn current_identity() -> (String, String) {
    use nix::unistd::{Group, User, getgid, getuid};
    let user = User::from_uid(getuid()).unwrap().expect("current user").name;
    let group = Group::from_gid(getgid()).unwrap().expect("current group").name;
    (user, group)
}
