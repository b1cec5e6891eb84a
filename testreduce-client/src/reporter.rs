//! Result reporting

use std::sync::Arc;
use testreduce_core::{Commit, TestResult, WorkItem};
use tracing::{debug, warn};

use crate::coordinator::CoordinatorClient;
use crate::worker::ExitReason;

/// Where the loop goes once a result has been submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Begin the next cycle
    Start,
    /// Stop the worker
    Finalize(ExitReason),
}

/// Submits finished results to the coordinator
#[derive(Debug, Clone)]
pub struct ResultReporter {
    coordinator: Arc<CoordinatorClient>,
}

impl ResultReporter {
    pub fn new(coordinator: Arc<CoordinatorClient>) -> Self {
        Self { coordinator }
    }

    /// Post `result` for `item` under `commit`.
    ///
    /// `commit` must be the sequencer's current commit, resolved right before
    /// this call. A failed submission is logged and otherwise treated like a
    /// successful one; only a fatal result changes the continuation.
    pub async fn post_result(
        &self,
        commit: &Commit,
        item: &WorkItem,
        result: &TestResult,
    ) -> Continuation {
        match self.coordinator.submit_result(commit, item, result).await {
            Ok(status) if status.is_success() => {
                debug!(
                    commit = %commit.short_hash(),
                    prefix = %item.prefix,
                    title = %item.title,
                    result = result.label(),
                    "Posted result"
                );
            }
            Ok(status) => {
                warn!(
                    status = status.as_u16(),
                    prefix = %item.prefix,
                    title = %item.title,
                    "Coordinator did not accept result"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    prefix = %item.prefix,
                    title = %item.title,
                    "Failed to post result"
                );
            }
        }

        if result.is_fatal() {
            Continuation::Finalize(ExitReason::FatalTestError)
        } else {
            Continuation::Start
        }
    }
}
