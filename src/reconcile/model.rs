//! In-memory desired state: hosts, their service checks, and host dependencies.
//!
//! The model is built fresh every run and discarded after rendering. Hash
//! containers are used on purpose; ordering is imposed by the renderer, never
//! by the model.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

/// A monitoring probe attached to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCheck {
    /// Service template name, emitted as `use`.
    pub check_name: String,
    /// Explicit command with arguments, present only for checks that take the
    /// device community (`check_name!community`).
    pub check_command: Option<String>,
    pub notes_url: String,
}

impl ServiceCheck {
    /// Block attributes other than `host_name`, unordered.
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        let mut attrs = vec![
            ("use", self.check_name.as_str()),
            ("notes_url", self.notes_url.as_str()),
        ];
        if let Some(command) = &self.check_command {
            attrs.push(("check_command", command.as_str()));
        }
        attrs
    }
}

/// A monitored device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub hostname: String,
    pub address: IpAddr,
    /// Host template name, emitted as `use`.
    pub template_name: String,
    pub notes_url: String,
    pub services: Vec<ServiceCheck>,
    /// Remote host names this host depends on. Every entry is a key of the
    /// owning [`DesiredState`].
    pub dependencies: HashSet<String>,
}

impl Host {
    /// Block attributes other than `host_name`, unordered. `services` and
    /// `dependencies` are bookkeeping and never rendered as attributes.
    #[must_use]
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("use", self.template_name.clone()),
            ("notes_url", self.notes_url.clone()),
            ("address", self.address.to_string()),
        ]
    }
}

/// Every host of one run, keyed by lower-case host name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    hosts: HashMap<String, Host>,
    dependency_tracking: bool,
}

impl DesiredState {
    #[must_use]
    pub fn new(dependency_tracking: bool) -> Self {
        Self {
            hosts: HashMap::new(),
            dependency_tracking,
        }
    }

    #[must_use]
    pub const fn dependency_tracking(&self) -> bool {
        self.dependency_tracking
    }

    /// Insert `host`, replacing any earlier host with the same name wholesale.
    /// Returns the replaced host.
    pub fn insert_host(&mut self, host: Host) -> Option<Host> {
        self.hosts.insert(host.hostname.clone(), host)
    }

    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        self.hosts.contains_key(hostname)
    }

    #[must_use]
    pub fn get(&self, hostname: &str) -> Option<&Host> {
        self.hosts.get(hostname)
    }

    /// Record `hostname -> remote_hostname`.
    ///
    /// Returns `false` without touching the model when either endpoint is not
    /// a host of this run, when the two are the same, or when the edge is
    /// already present.
    pub fn add_dependency(&mut self, hostname: &str, remote_hostname: &str) -> bool {
        if hostname == remote_hostname || !self.hosts.contains_key(remote_hostname) {
            return false;
        }
        self.hosts
            .get_mut(hostname)
            .is_some_and(|host| host.dependencies.insert(remote_hostname.to_string()))
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn service_count(&self) -> usize {
        self.hosts.values().map(|host| host.services.len()).sum()
    }

    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.hosts.values().map(|host| host.dependencies.len()).sum()
    }
}
