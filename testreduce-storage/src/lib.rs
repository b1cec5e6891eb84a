//! Persistence layer for the testreduce client
//!
//! This crate provides the read side of the shared results database: the
//! list of commits to test and previously computed round-trip results.

pub mod error;
pub mod manager;
pub mod migrations;
pub mod repositories;

pub use error::{Error, Result};
pub use manager::{DatabaseConfig, StorageManager};

/// Re-export core types for convenience
pub use testreduce_core as core;
