//! Settings file loading and validation.
//!
//! The settings file is parsed into an all-optional raw document first so
//! that every missing required key can be reported in a single error. The
//! validated [`Config`] is immutable and passed by reference to each stage
//! of the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::core::errors::{Result, SyncError};

/// Name of the generated file inside the Nagios `conf.d` directory.
pub const CONFIG_FILE_NAME: &str = "observium_nagios_host_services.cfg";

/// Settings path used when neither `--config` nor `NAGSYNC_CONFIG` is given.
pub const DEFAULT_SETTINGS_PATH: &str = "settings.toml";

/// Complete example settings file, printed by `nagsync example-config`.
pub const EXAMPLE_SETTINGS: &str = r#"[inventory]
database = "/var/lib/observium/observium.sqlite3"

[web]
base_url = "https://observium-web.example.com"

[nagios]
confd = "/etc/nagios/conf.d"
binary = "/usr/sbin/nagios"
initd = "/etc/init.d/nagios"
host_template = "observium-host"
host_dependency = true
user = "nagios"

[checks]
ios = [
    "observium-ios-check-cpu",
    "observium-ios-check-mem",
    { name = "observium-check-snmp-if", community = true },
]
"#;

/// One OS-specific service check.
///
/// Written either as a bare template name or as a table when the check needs
/// the device's SNMP community appended to its command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CheckRule {
    /// Service template name only.
    Plain(String),
    /// Template name plus whether the community is appended.
    Detailed {
        /// Service template name.
        name: String,
        /// Append `!<community>` to the check command.
        #[serde(default)]
        community: bool,
    },
}

impl CheckRule {
    /// Service template name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// Whether the device community string is interpolated into the command.
    #[must_use]
    pub const fn requires_community(&self) -> bool {
        match self {
            Self::Plain(_) => false,
            Self::Detailed { community, .. } => *community,
        }
    }
}

/// OS name (lower-case) to the checks attached to every device running it.
pub type CheckRules = BTreeMap<String, Vec<CheckRule>>;

/// Inventory data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Path to the Observium SQLite database.
    pub database: PathBuf,
}

/// Observium web front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    /// Base URL that device notes links are joined onto.
    pub base_url: Url,
}

/// Nagios deployment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NagiosConfig {
    /// Directory holding the generated file.
    pub confd: PathBuf,
    /// Nagios daemon binary.
    pub binary: PathBuf,
    /// Init/control script invoked with `restart`.
    pub initd: PathBuf,
    /// Host template applied with `use` on every host block.
    pub host_template: String,
    /// Emit hostdependency blocks derived from topology.
    pub host_dependency: bool,
    /// Owning user of the deployed file.
    pub user: String,
    /// Owning group of the deployed file.
    pub group: String,
}

/// Validated, immutable runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `[inventory]` section.
    pub inventory: InventoryConfig,
    /// `[web]` section.
    pub web: WebConfig,
    /// `[nagios]` section.
    pub nagios: NagiosConfig,
    /// `[checks]` table, keyed by lower-case OS name.
    pub checks: CheckRules,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    inventory: RawInventory,
    web: RawWeb,
    nagios: RawNagios,
    checks: CheckRules,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInventory {
    database: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWeb {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNagios {
    confd: Option<PathBuf>,
    binary: Option<PathBuf>,
    initd: Option<PathBuf>,
    host_template: Option<String>,
    host_dependency: Option<bool>,
    user: Option<String>,
    group: Option<String>,
}

impl Config {
    /// Load and validate the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::MissingConfig {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(SyncError::io(path, err)),
        };
        Self::from_toml_str(&text)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        raw.validate()
    }

    /// Full path of the generated file.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.nagios.confd.join(CONFIG_FILE_NAME)
    }

    /// Checks for a device OS, if any are configured.
    #[must_use]
    pub fn checks_for(&self, os: &str) -> Option<&[CheckRule]> {
        self.checks.get(os).map(Vec::as_slice)
    }
}

impl RawConfig {
    fn validate(self) -> Result<Config> {
        let mut missing = Vec::new();
        let database = require(self.inventory.database, "inventory.database", &mut missing);
        let base_url = require(self.web.base_url, "web.base_url", &mut missing);
        let confd = require(self.nagios.confd, "nagios.confd", &mut missing);
        let binary = require(self.nagios.binary, "nagios.binary", &mut missing);
        let initd = require(self.nagios.initd, "nagios.initd", &mut missing);
        let host_template = require(
            self.nagios.host_template,
            "nagios.host_template",
            &mut missing,
        );
        let user = require(self.nagios.user, "nagios.user", &mut missing);

        let (
            Some(database),
            Some(base_url),
            Some(confd),
            Some(binary),
            Some(initd),
            Some(host_template),
            Some(user),
        ) = (database, base_url, confd, binary, initd, host_template, user)
        else {
            return Err(SyncError::InvalidConfig {
                details: format!("required settings are missing: {}", missing.join(", ")),
            });
        };

        let base_url = Url::parse(&base_url).map_err(|err| SyncError::InvalidConfig {
            details: format!("web.base_url {base_url:?} is not an absolute URL: {err}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidConfig {
                details: format!("web.base_url {base_url} cannot have device paths joined onto it"),
            });
        }

        let checks = self
            .checks
            .into_iter()
            .map(|(os, rules)| (os.to_lowercase(), rules))
            .collect();

        let group = self.nagios.group.unwrap_or_else(|| user.clone());

        Ok(Config {
            inventory: InventoryConfig { database },
            web: WebConfig { base_url },
            nagios: NagiosConfig {
                confd,
                binary,
                initd,
                host_template,
                host_dependency: self.nagios.host_dependency.unwrap_or(false),
                user,
                group,
            },
            checks,
        })
    }
}

fn require<T>(value: Option<T>, key: &'static str, missing: &mut Vec<&'static str>) -> Option<T> {
    if value.is_none() {
        missing.push(key);
    }
    value
}
