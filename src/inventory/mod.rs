//! Inventory source: device rows and topology edges read from Observium.

#![allow(missing_docs)]

#[cfg(feature = "sqlite")]
pub mod sqlite;

use serde::Serialize;

use crate::core::errors::Result;

/// One row of the `devices` table.
///
/// `hostname` and `os` are lower-cased by the source before they reach the
/// builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub device_id: i64,
    pub community: String,
    pub hostname: String,
    pub os: String,
}

impl DeviceRecord {
    pub fn new(
        device_id: i64,
        community: impl Into<String>,
        hostname: impl AsRef<str>,
        os: impl AsRef<str>,
    ) -> Self {
        Self {
            device_id,
            community: community.into(),
            hostname: hostname.as_ref().to_lowercase(),
            os: os.as_ref().to_lowercase(),
        }
    }
}

/// Directed link `hostname -> remote_hostname` discovered by Observium.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TopologyEdge {
    pub hostname: String,
    pub remote_hostname: String,
}

impl TopologyEdge {
    pub fn new(hostname: impl AsRef<str>, remote_hostname: impl AsRef<str>) -> Self {
        Self {
            hostname: hostname.as_ref().to_lowercase(),
            remote_hostname: remote_hostname.as_ref().to_lowercase(),
        }
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.hostname == self.remote_hostname
    }
}

/// Read-only access to the relational inventory.
pub trait InventorySource {
    /// All devices, in retrieval order.
    fn devices(&self) -> Result<Vec<DeviceRecord>>;
    /// Links between devices, in retrieval order.
    fn topology(&self) -> Result<Vec<TopologyEdge>>;
}

/// In-memory inventory, for library callers that already hold the rows.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    pub devices: Vec<DeviceRecord>,
    pub topology: Vec<TopologyEdge>,
}

impl StaticInventory {
    #[must_use]
    pub fn new(devices: Vec<DeviceRecord>, topology: Vec<TopologyEdge>) -> Self {
        Self { devices, topology }
    }
}

impl InventorySource for StaticInventory {
    fn devices(&self) -> Result<Vec<DeviceRecord>> {
        Ok(self.devices.clone())
    }

    fn topology(&self) -> Result<Vec<TopologyEdge>> {
        Ok(self.topology.clone())
    }
}
