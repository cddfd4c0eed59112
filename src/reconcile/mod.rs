//! Desired-state reconciliation: build the model, render it, detect change,
//! publish.

pub mod builder;
pub mod change;
pub mod deploy;
pub mod model;
pub mod pipeline;
pub mod render;
