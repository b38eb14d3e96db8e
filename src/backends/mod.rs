//! Driver bindings
//!
//! This module implements the driver boundary traits for concrete database
//! drivers.

#[cfg(feature = "sqlite")]
pub mod sqlite;
