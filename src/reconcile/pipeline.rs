//! One reconciliation run: inventory -> model -> render -> detect -> publish.
//!
//! Fatal errors (configuration, data source, write, ownership) are returned
//! as `Err` and abort the run before anything is published. Per-device
//! resolution failures and restart failures are recorded in the
//! [`RunReport`] and never change the outcome.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::builder::{DesiredStateBuilder, SkippedDevice};
use super::change::{ChangeDecision, detect};
use super::deploy::{DeployReport, publish};
use super::render::{RenderedConfig, render};
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::inventory::InventorySource;
use crate::platform::pal::Platform;

/// How far a run goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Publish and restart when the content changed.
    #[default]
    Publish,
    /// Compute the change decision without writing anything.
    Check,
    /// Render only; the deployed file is not even read.
    Render,
}

/// A single step of the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStep {
    /// What the step does, in report wording.
    pub description: String,
    /// Whether the step completed.
    pub done: bool,
    /// Failure detail; a failed step never carries `done == true`.
    pub error: Option<String>,
}

/// Structured report of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// How far the run was allowed to go.
    pub mode: RunMode,
    /// Deployed file path.
    pub target: PathBuf,
    /// Device rows read from the inventory.
    pub devices: usize,
    /// Hosts in the generated file.
    pub hosts: usize,
    /// Service checks in the generated file.
    pub services: usize,
    /// Host dependencies in the generated file.
    pub dependencies: usize,
    /// Devices that contributed nothing, with the reason.
    pub skipped_devices: Vec<SkippedDevice>,
    /// Host names replaced by a later device row.
    pub replaced_hosts: Vec<String>,
    /// Topology edges dropped for a missing endpoint.
    pub dropped_edges: usize,
    /// Digest comparison; absent in [`RunMode::Render`].
    pub decision: Option<ChangeDecision>,
    /// Whether the deployed file was replaced.
    pub published: bool,
    /// Publish details when `published` is set.
    pub deploy: Option<DeployReport>,
    /// Ordered step log.
    pub steps: Vec<RunStep>,
    /// Rendered file, kept only in [`RunMode::Render`].
    #[serde(skip)]
    pub rendered: Option<RenderedConfig>,
}

impl RunReport {
    fn new(mode: RunMode, config: &Config) -> Self {
        Self {
            started_at: Utc::now(),
            mode,
            target: config.target_path(),
            devices: 0,
            hosts: 0,
            services: 0,
            dependencies: 0,
            skipped_devices: Vec::new(),
            replaced_hosts: Vec::new(),
            dropped_edges: 0,
            decision: None,
            published: false,
            deploy: None,
            steps: Vec::new(),
            rendered: None,
        }
    }

    fn step_ok(&mut self, description: impl Into<String>) {
        self.steps.push(RunStep {
            description: description.into(),
            done: true,
            error: None,
        });
    }

    fn step_fail(&mut self, description: impl Into<String>, error: impl Into<String>) {
        self.steps.push(RunStep {
            description: description.into(),
            done: false,
            error: Some(error.into()),
        });
    }

    fn step_plan(&mut self, description: impl Into<String>) {
        self.steps.push(RunStep {
            description: description.into(),
            done: false,
            error: None,
        });
    }
}

/// Run the pipeline once.
///
/// # Errors
/// Returns the fatal error that aborted the run; nothing is published then.
pub fn run(
    config: &Config,
    inventory: &dyn InventorySource,
    platform: &dyn Platform,
    mode: RunMode,
) -> Result<RunReport> {
    let mut report = RunReport::new(mode, config);

    let devices = inventory.devices()?;
    let topology = if config.nagios.host_dependency {
        info!("querying for dependencies");
        inventory.topology()?
    } else {
        Vec::new()
    };
    report.devices = devices.len();
    report.step_ok(format!(
        "Loaded {} devices and {} topology edges",
        devices.len(),
        topology.len()
    ));

    let built = DesiredStateBuilder::new(config, platform).build(&devices, &topology)?;
    report.hosts = built.state.host_count();
    report.services = built.state.service_count();
    report.dependencies = built.state.dependency_count();
    report.dropped_edges = built.dropped_edges;
    report.replaced_hosts = built.replaced;
    for device in &built.skipped {
        report.step_fail(
            format!("Build host {} (device {})", device.hostname, device.device_id),
            device.reason.clone(),
        );
    }
    report.skipped_devices = built.skipped;
    report.step_ok(format!(
        "Built {} hosts, {} services, {} dependencies",
        report.hosts, report.services, report.dependencies
    ));

    let rendered = render(&built.state);
    report.step_ok(format!("Rendered {} bytes", rendered.len()));

    if mode == RunMode::Render {
        report.rendered = Some(rendered);
        return Ok(report);
    }

    let decision = detect(&rendered, &report.target)?;
    info!(
        new_hash = %decision.new_hash,
        previous_hash = decision.previous_hash.as_deref().unwrap_or("-"),
        should_publish = decision.should_publish,
        "compared against deployed config"
    );
    let should_publish = decision.should_publish;
    report.decision = Some(decision);

    if !should_publish {
        info!("config has not changed, nothing to publish");
        report.step_ok("Config unchanged, nothing to publish");
        return Ok(report);
    }

    if mode == RunMode::Check {
        report.step_plan(format!("Publish {}", report.target.display()));
        report.step_plan(format!("Restart via {} restart", config.nagios.initd.display()));
        return Ok(report);
    }

    let deployed = publish(&rendered, config, platform)?;
    report.published = true;
    report.step_ok(format!(
        "Published {} (owner {})",
        deployed.target.display(),
        deployed.owner
    ));
    match (&deployed.restart, &deployed.restart_error) {
        (Some(outcome), _) if deployed.restarted() => {
            report.step_ok(format!("Ran {}", outcome.command));
        }
        (Some(outcome), _) => report.step_fail(
            format!("Ran {}", outcome.command),
            format!(
                "exit status {}",
                outcome
                    .exit_code
                    .map_or_else(|| "unknown".to_string(), |code| code.to_string())
            ),
        ),
        (None, Some(err)) => report.step_fail("Restart nagios", err.clone()),
        (None, None) => {}
    }
    report.deploy = Some(deployed);

    Ok(report)
}

/// Format a run report for terminal output.
#[must_use]
pub fn format_run_report(report: &RunReport) -> String {
    let mut out = String::new();

    let mode = match report.mode {
        RunMode::Publish => "run",
        RunMode::Check => "check",
        RunMode::Render => "render",
    };
    let _ = writeln!(out, "nagsync {mode} report:\n");

    for step in &report.steps {
        let icon = if step.error.is_some() {
            "FAIL"
        } else if step.done {
            "DONE"
        } else {
            "PLAN"
        };
        let _ = writeln!(out, "  [{icon}] {}", step.description);
        if let Some(err) = &step.error {
            let _ = writeln!(out, "         error: {err}");
        }
    }

    out.push('\n');
    let _ = writeln!(out, "  Target:   {}", report.target.display());
    let _ = writeln!(
        out,
        "  Hosts:    {} of {} devices ({} skipped)",
        report.hosts,
        report.devices,
        report.skipped_devices.len()
    );
    if let Some(decision) = &report.decision {
        let _ = writeln!(out, "  Hash:     {}", decision.new_hash);
        let status = if report.published {
            "published"
        } else if decision.should_publish {
            "changed"
        } else {
            "unchanged"
        };
        let _ = writeln!(out, "  Status:   {status}");
    }
    if let Some(outcome) = report.deploy.as_ref().and_then(|d| d.restart.as_ref()) {
        let trimmed = outcome.output.trim_end();
        if !trimmed.is_empty() {
            let _ = writeln!(out, "\n{trimmed}");
        }
    }

    out
}
