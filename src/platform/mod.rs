//! Platform abstraction: name resolution, file ownership, daemon control.

pub mod pal;
