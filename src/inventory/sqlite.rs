//! Observium inventory read from its SQLite database.
//!
//! The connection is opened read-only; this tool never writes to the
//! inventory. Host names and OS names are lower-cased in SQL so that every
//! downstream key is already normalized. A device without a host name is
//! still returned, with an empty name, so the builder records it as skipped.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::{DeviceRecord, InventorySource, TopologyEdge};
use crate::core::errors::{Result, SyncError};

const DEVICES_SQL: &str = "\
SELECT device_id,
       COALESCE(community, ''),
       COALESCE(lower(hostname), ''),
       COALESCE(lower(os), '')
FROM devices";

const TOPOLOGY_SQL: &str = "\
SELECT lower(d.hostname),
       lower(l.remote_hostname)
FROM devices d
INNER JOIN ports p ON p.device_id = d.device_id
INNER JOIN links l ON p.port_id = l.local_port_id
WHERE p.ifAlias IS NOT NULL
  AND p.ifAlias <> ''
  AND l.remote_hostname IS NOT NULL
  AND lower(d.hostname) <> lower(l.remote_hostname)";

/// Inventory backed by an Observium SQLite database.
pub struct SqliteInventory {
    conn: Connection,
}

impl SqliteInventory {
    /// Open the database at `path` read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| SyncError::DataSourceConnect {
            location: path.display().to_string(),
            details: err.to_string(),
        })?;
        debug!(path = %path.display(), "opened inventory database");
        Ok(Self { conn })
    }

    /// Wrap an existing connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

fn sql_error(context: &'static str) -> impl Fn(rusqlite::Error) -> SyncError {
    move |err| SyncError::Sql {
        context,
        details: err.to_string(),
    }
}

impl InventorySource for SqliteInventory {
    fn devices(&self) -> Result<Vec<DeviceRecord>> {
        let mut stmt = self
            .conn
            .prepare(DEVICES_SQL)
            .map_err(sql_error("devices query"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DeviceRecord {
                    device_id: row.get(0)?,
                    community: row.get(1)?,
                    hostname: row.get(2)?,
                    os: row.get(3)?,
                })
            })
            .map_err(sql_error("devices query"))?;
        let devices = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_error("devices row"))?;
        debug!(count = devices.len(), "loaded device rows");
        Ok(devices)
    }

    fn topology(&self) -> Result<Vec<TopologyEdge>> {
        let mut stmt = self
            .conn
            .prepare(TOPOLOGY_SQL)
            .map_err(sql_error("topology query"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TopologyEdge {
                    hostname: row.get(0)?,
                    remote_hostname: row.get(1)?,
                })
            })
            .map_err(sql_error("topology query"))?;
        let edges = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(sql_error("topology row"))?;
        debug!(count = edges.len(), "loaded topology rows");
        Ok(edges)
    }
}
