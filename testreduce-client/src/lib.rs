//! Worker client for distributed round-trip regression testing
//!
//! A worker pins the oldest untested commit, then loops: fetch a work item
//! from the coordinator, produce a result for it, report the result, and
//! start over. See [`worker::WorkLoop`] for the state machine.

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod logging;
pub mod reporter;
pub mod runner;
pub mod worker;

pub use config::Config;
pub use error::{ClientError, Result};
pub use worker::{ExitReason, LoopState, WorkLoop};
