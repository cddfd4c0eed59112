//! nagios_sync: derive a Nagios host/service configuration from Observium
//! inventory and publish it only when its content changed.
//!
//! Data flow for one run:
//! inventory rows -> [`reconcile::builder`] -> [`reconcile::render`] ->
//! [`reconcile::change`] -> (no-op | [`reconcile::deploy`]).

pub mod core;
pub mod inventory;
pub mod logger;
pub mod platform;
pub mod reconcile;

#[cfg(feature = "cli")]
pub mod cli_app;

pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SyncError};
pub use crate::reconcile::pipeline::{RunMode, RunReport, run};
