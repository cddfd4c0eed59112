//! Desired-state builder: inventory rows + topology + check rules -> model.
//!
//! Each device is turned into a [`DeviceOutcome`] on its own; a device whose
//! name does not resolve is skipped and recorded, and never stops the batch.
//! Only errors that are [`SyncError::is_fatal`] abort the build.
//! Duplicate host names are last-write-wins: the later row replaces the
//! earlier host entirely, services included.

use serde::Serialize;
use tracing::{debug, error, info};
use url::Url;

use super::model::{DesiredState, Host, ServiceCheck};
use crate::core::config::{CheckRule, Config};
use crate::core::errors::{Result, SyncError};
use crate::inventory::{DeviceRecord, TopologyEdge};
use crate::platform::pal::Platform;

/// A device that contributed nothing to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDevice {
    /// Inventory id of the device.
    pub device_id: i64,
    /// Normalized host name; empty when the inventory had none.
    pub hostname: String,
    /// Error code of the failure.
    pub code: &'static str,
    /// Rendered error message.
    pub reason: String,
}

/// Per-device result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// The device became a host.
    Built(Host),
    /// The device contributed nothing.
    Skipped(SkippedDevice),
}

/// Everything the builder produced for one run.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    /// The model to render.
    pub state: DesiredState,
    /// Devices skipped, in retrieval order.
    pub skipped: Vec<SkippedDevice>,
    /// Host names seen more than once; the last row won.
    pub replaced: Vec<String>,
    /// Topology edges dropped because an endpoint is not a host of this run.
    pub dropped_edges: usize,
}

/// Builds the desired state for one run.
pub struct DesiredStateBuilder<'a> {
    config: &'a Config,
    platform: &'a dyn Platform,
}

impl<'a> DesiredStateBuilder<'a> {
    /// Builder reading check rules and URLs from `config`.
    #[must_use]
    pub fn new(config: &'a Config, platform: &'a dyn Platform) -> Self {
        Self { config, platform }
    }

    /// Build the model. `topology` is ignored unless dependency tracking is
    /// enabled in the configuration.
    ///
    /// # Errors
    /// Returns the first fatal error; per-device failures are recorded in
    /// [`BuildOutcome::skipped`] instead.
    pub fn build(
        &self,
        devices: &[DeviceRecord],
        topology: &[TopologyEdge],
    ) -> Result<BuildOutcome> {
        let mut outcome = BuildOutcome {
            state: DesiredState::new(self.config.nagios.host_dependency),
            ..BuildOutcome::default()
        };

        for device in devices {
            match self.build_host(device)? {
                DeviceOutcome::Built(host) => {
                    let hostname = host.hostname.clone();
                    if outcome.state.insert_host(host).is_some() {
                        info!(hostname = %hostname, device_id = device.device_id, "duplicate host name, later row replaces earlier host");
                        outcome.replaced.push(hostname);
                    }
                }
                DeviceOutcome::Skipped(skipped) => outcome.skipped.push(skipped),
            }
        }

        if outcome.state.dependency_tracking() {
            outcome.dropped_edges = attach_dependencies(&mut outcome.state, topology);
        }

        Ok(outcome)
    }

    /// Build the host for a single device.
    ///
    /// # Errors
    /// Fatal errors only; a device that cannot be resolved is
    /// [`DeviceOutcome::Skipped`].
    pub fn build_host(&self, device: &DeviceRecord) -> Result<DeviceOutcome> {
        let hostname = device.hostname.to_lowercase();

        let address = match self.resolve(&hostname) {
            Ok(address) => address,
            Err(err) if !err.is_fatal() => {
                error!(hostname = %hostname, device_id = device.device_id, error = %err, "skipping device");
                return Ok(DeviceOutcome::Skipped(skipped(device, &hostname, &err)));
            }
            Err(err) => return Err(err),
        };

        let notes_url = device_url(&self.config.web.base_url, device.device_id)?;

        let services = self
            .config
            .checks_for(&device.os.to_lowercase())
            .map(|rules| {
                rules
                    .iter()
                    .map(|rule| service_check(rule, &device.community, &notes_url))
                    .collect()
            })
            .unwrap_or_default();

        Ok(DeviceOutcome::Built(Host {
            hostname,
            address,
            template_name: self.config.nagios.host_template.clone(),
            notes_url,
            services,
            dependencies: Default::default(),
        }))
    }

    fn resolve(&self, hostname: &str) -> Result<std::net::IpAddr> {
        if hostname.is_empty() {
            return Err(SyncError::Resolution {
                hostname: String::new(),
                details: "device has no host name".to_string(),
            });
        }
        self.platform.resolve(hostname)
    }
}

fn skipped(device: &DeviceRecord, hostname: &str, err: &SyncError) -> SkippedDevice {
    SkippedDevice {
        device_id: device.device_id,
        hostname: hostname.to_string(),
        code: err.code(),
        reason: err.to_string(),
    }
}

/// Observium device page for `device_id`, relative to `base`.
///
/// # Errors
/// Only when `base` cannot be a base URL, which configuration validation
/// already rejects.
pub fn device_url(base: &Url, device_id: i64) -> Result<String> {
    base.join(&format!("device/device={device_id}/"))
        .map(String::from)
        .map_err(|err| SyncError::InvalidConfig {
            details: format!("cannot build notes URL from {base}: {err}"),
        })
}

fn service_check(rule: &CheckRule, community: &str, notes_url: &str) -> ServiceCheck {
    let check_name = rule.name().to_string();
    let check_command = rule
        .requires_community()
        .then(|| format!("{check_name}!{community}"));
    ServiceCheck {
        check_name,
        check_command,
        notes_url: notes_url.to_string(),
    }
}

/// Attach every edge whose endpoints are both hosts of this run. Returns the
/// number of edges dropped.
fn attach_dependencies(state: &mut DesiredState, topology: &[TopologyEdge]) -> usize {
    let mut dropped = 0;
    for edge in topology {
        let edge = TopologyEdge::new(&edge.hostname, &edge.remote_hostname);
        if edge.is_self_loop() {
            continue;
        }
        let (hostname, remote) = (edge.hostname.as_str(), edge.remote_hostname.as_str());
        if !state.contains(hostname) {
            debug!(hostname = %hostname, "skipping edge, no host entry for hostname");
            dropped += 1;
            continue;
        }
        if !state.contains(remote) {
            debug!(remote_hostname = %remote, "skipping edge, no host entry for remote_hostname");
            dropped += 1;
            continue;
        }
        if state.add_dependency(hostname, remote) {
            info!(hostname = %hostname, remote_hostname = %remote, "found dependency");
        }
    }
    dropped
}
