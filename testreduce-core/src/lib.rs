//! Core domain models for the testreduce round-trip client
//!
//! This crate contains the commit and work item models, the result
//! representation reported back to the coordinator, and the commit
//! sequencer that decides which revision a worker is testing.

pub mod commit;
pub mod error;
pub mod result;
pub mod sequencer;
pub mod work;

pub use commit::Commit;
pub use error::{Error, Result};
pub use result::{ErrorKind, TestResult};
pub use sequencer::{CommitSequencer, ProgressSnapshot};
pub use work::WorkItem;
