//! Work loop state machine
//!
//! One worker process runs one [`WorkLoop`]. The loop walks these states:
//!
//! ```text
//! Start ──► FetchingWork ──► RunningTest ──► PostingResult ──┐
//!   ▲            │ retry (sleep)                              │
//!   └────────────┴────────────────────────────────────────────┘
//!
//! Start / FetchingWork / PostingResult ──► Terminated
//! ```
//!
//! Every transition is a call to [`WorkLoop::step`]. `Terminated` is
//! absorbing and carries the [`ExitReason`] the process exits with.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use testreduce_core::{Commit, CommitSequencer, ProgressSnapshot, TestResult, WorkItem};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::coordinator::{CoordinatorClient, FetchAction};
use crate::executor::TestExecutor;
use crate::reporter::{Continuation, ResultReporter};

/// Why a worker stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The coordinator requires a newer client
    VersionMismatch,
    /// The commit under test moved away from the one pinned at startup
    CommitDrift { pinned: String, current: String },
    /// A test failed in a way that leaves the worker in an unknown state
    FatalTestError,
    /// Every known commit has been tested
    CommitsExhausted,
}

impl ExitReason {
    /// Process exit code; 0 tells a supervisor the exit was voluntary
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitReason::VersionMismatch | ExitReason::CommitDrift { .. } => 0,
            ExitReason::FatalTestError | ExitReason::CommitsExhausted => 1,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::VersionMismatch => write!(f, "client update required"),
            ExitReason::CommitDrift { pinned, current } => {
                write!(f, "commit changed from {} to {}", pinned, current)
            }
            ExitReason::FatalTestError => write!(f, "fatal test error"),
            ExitReason::CommitsExhausted => write!(f, "no further commits to test"),
        }
    }
}

/// Loop states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Start,
    FetchingWork,
    RunningTest(WorkItem),
    PostingResult { item: WorkItem, result: TestResult },
    Terminated(ExitReason),
}

impl LoopState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, LoopState::Terminated(_))
    }
}

/// Per-process session: identity plus the commit pinned at startup
#[derive(Debug, Clone)]
pub struct Session {
    pub worker_id: Uuid,
    pub pinned: Commit,
    pub started_at: DateTime<Utc>,
}

/// The worker's work loop
pub struct WorkLoop {
    session: Session,
    sequencer: CommitSequencer,
    coordinator: Arc<CoordinatorClient>,
    executor: Arc<dyn TestExecutor>,
    reporter: ResultReporter,
    progress: Option<watch::Sender<Option<ProgressSnapshot>>>,
}

impl WorkLoop {
    /// Pin the sequencer's current commit and build the loop.
    ///
    /// Fails with `CommitsExhausted` when there is nothing to test.
    pub fn new(
        mut sequencer: CommitSequencer,
        coordinator: Arc<CoordinatorClient>,
        executor: Arc<dyn TestExecutor>,
    ) -> testreduce_core::Result<Self> {
        let pinned = sequencer.advance_if_exhausted()?;
        let session = Session {
            worker_id: Uuid::new_v4(),
            pinned,
            started_at: Utc::now(),
        };

        Ok(Self {
            session,
            sequencer,
            reporter: ResultReporter::new(coordinator.clone()),
            coordinator,
            executor,
            progress: None,
        })
    }

    /// Publish progress snapshots to `sender` after every cycle
    pub fn with_progress(mut self, sender: watch::Sender<Option<ProgressSnapshot>>) -> Self {
        sender.send_replace(self.sequencer.snapshot());
        self.progress = Some(sender);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sequencer(&self) -> &CommitSequencer {
        &self.sequencer
    }

    /// Drive the loop until it terminates
    pub async fn run(&mut self) -> ExitReason {
        info!(
            worker_id = %self.session.worker_id,
            commit = %self.session.pinned.hash,
            ctime = %self.session.pinned.ctime(),
            executor = self.executor.name(),
            "Starting work loop"
        );

        let mut state = LoopState::Start;
        loop {
            state = self.step(state).await;
            if let LoopState::Terminated(reason) = &state {
                let uptime = Utc::now() - self.session.started_at;
                info!(
                    worker_id = %self.session.worker_id,
                    exit_code = reason.exit_code(),
                    uptime_secs = uptime.num_seconds(),
                    "Work loop terminated: {}",
                    reason
                );
                return reason.clone();
            }
        }
    }

    /// Perform one transition
    pub async fn step(&mut self, state: LoopState) -> LoopState {
        match state {
            LoopState::Start => self.check_commit(),
            LoopState::FetchingWork => self.fetch_work().await,
            LoopState::RunningTest(item) => self.run_test(item).await,
            LoopState::PostingResult { item, result } => self.post_result(item, result).await,
            LoopState::Terminated(reason) => LoopState::Terminated(reason),
        }
    }

    fn check_commit(&mut self) -> LoopState {
        let current = match self.sequencer.advance_if_exhausted() {
            Ok(commit) => commit,
            Err(e) => {
                error!(error = %e, "Cannot resolve current commit");
                return LoopState::Terminated(ExitReason::CommitsExhausted);
            }
        };

        if current.hash != self.session.pinned.hash {
            info!(
                pinned = %self.session.pinned.hash,
                current = %current.hash,
                "Exiting because the commit hash changed"
            );
            return LoopState::Terminated(ExitReason::CommitDrift {
                pinned: self.session.pinned.hash.clone(),
                current: current.hash,
            });
        }

        LoopState::FetchingWork
    }

    async fn fetch_work(&mut self) -> LoopState {
        match self.coordinator.fetch_work(&self.session.pinned).await {
            FetchAction::RunTest(item) => LoopState::RunningTest(item),
            FetchAction::Retry(delay) => {
                debug!(delay_ms = delay.as_millis() as u64, "Scheduling retry");
                tokio::time::sleep(delay).await;
                LoopState::Start
            }
            FetchAction::Abort => LoopState::Terminated(ExitReason::VersionMismatch),
        }
    }

    async fn run_test(&mut self, item: WorkItem) -> LoopState {
        debug!(prefix = %item.prefix, title = %item.title, "Running test");
        let result = self.executor.run_test(&self.session.pinned, &item).await;
        self.sequencer.record_completion();
        LoopState::PostingResult { item, result }
    }

    async fn post_result(&mut self, item: WorkItem, result: TestResult) -> LoopState {
        // The completion is already counted, so a threshold crossing is
        // reported under the next commit.
        let commit = match self.sequencer.advance_if_exhausted() {
            Ok(commit) => commit,
            Err(e) => {
                error!(error = %e, "Cannot resolve commit for result");
                return LoopState::Terminated(ExitReason::CommitsExhausted);
            }
        };

        let continuation = self.reporter.post_result(&commit, &item, &result).await;
        self.publish_progress();

        match continuation {
            Continuation::Start => LoopState::Start,
            Continuation::Finalize(reason) => {
                warn!(
                    prefix = %item.prefix,
                    title = %item.title,
                    "Result reported after fatal error, stopping worker"
                );
                LoopState::Terminated(reason)
            }
        }
    }

    fn publish_progress(&self) {
        if let Some(sender) = &self.progress {
            sender.send_replace(self.sequencer.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::RetryPolicy;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;

    struct NeverCalled;

    #[async_trait]
    impl TestExecutor for NeverCalled {
        async fn run_test(&self, _commit: &Commit, _item: &WorkItem) -> TestResult {
            panic!("executor must not run");
        }

        fn name(&self) -> &'static str {
            "never"
        }
    }

    fn commits_newest_first(hashes_oldest_first: &[&str]) -> Vec<Commit> {
        let base = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
        hashes_oldest_first
            .iter()
            .enumerate()
            .rev()
            .map(|(i, h)| Commit::new(*h, base + chrono::Duration::days(i as i64)).unwrap())
            .collect()
    }

    fn unreachable_loop(total_tests: u64) -> WorkLoop {
        // Port 9 is discard; nothing here should ever be contacted.
        let coordinator = CoordinatorClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(50),
            RetryPolicy::default(),
        )
        .unwrap();
        let sequencer =
            CommitSequencer::new(commits_newest_first(&["C1", "C2"]), total_tests).unwrap();
        WorkLoop::new(sequencer, Arc::new(coordinator), Arc::new(NeverCalled)).unwrap()
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitReason::VersionMismatch.exit_code(), 0);
        assert_eq!(
            ExitReason::CommitDrift {
                pinned: "a".into(),
                current: "b".into()
            }
            .exit_code(),
            0
        );
        assert_eq!(ExitReason::FatalTestError.exit_code(), 1);
        assert_eq!(ExitReason::CommitsExhausted.exit_code(), 1);
    }

    #[test]
    fn test_new_pins_oldest_commit() {
        let work_loop = unreachable_loop(10);
        assert_eq!(work_loop.session().pinned.hash, "C1");
        assert_eq!(work_loop.sequencer().remaining(), 1);
    }

    #[test]
    fn test_new_without_commits_fails() {
        let coordinator =
            CoordinatorClient::new("http://127.0.0.1:9", Duration::from_secs(1), RetryPolicy::default())
                .unwrap();
        let sequencer = CommitSequencer::new(Vec::new(), 1).unwrap();
        let result = WorkLoop::new(sequencer, Arc::new(coordinator), Arc::new(NeverCalled));
        assert!(matches!(result, Err(testreduce_core::Error::CommitsExhausted)));
    }

    #[tokio::test]
    async fn test_terminated_is_absorbing() {
        let mut work_loop = unreachable_loop(10);
        let state = LoopState::Terminated(ExitReason::VersionMismatch);
        let next = work_loop.step(state.clone()).await;
        assert_eq!(next, state);
    }

    #[tokio::test]
    async fn test_start_with_pinned_commit_moves_to_fetching() {
        let mut work_loop = unreachable_loop(10);
        assert_eq!(work_loop.step(LoopState::Start).await, LoopState::FetchingWork);
    }

    #[tokio::test]
    async fn test_start_detects_commit_drift() {
        let mut work_loop = unreachable_loop(1);
        work_loop.sequencer.record_completion();

        let next = work_loop.step(LoopState::Start).await;
        assert_eq!(
            next,
            LoopState::Terminated(ExitReason::CommitDrift {
                pinned: "C1".into(),
                current: "C2".into()
            })
        );
        assert_eq!(next_exit_code(&next), Some(0));
    }

    #[tokio::test]
    async fn test_start_surfaces_exhausted_commits() {
        let coordinator =
            CoordinatorClient::new("http://127.0.0.1:9", Duration::from_secs(1), RetryPolicy::default())
                .unwrap();
        let sequencer = CommitSequencer::new(commits_newest_first(&["only"]), 1).unwrap();
        let mut work_loop =
            WorkLoop::new(sequencer, Arc::new(coordinator), Arc::new(NeverCalled)).unwrap();
        work_loop.sequencer.record_completion();

        let next = work_loop.step(LoopState::Start).await;
        assert_eq!(next, LoopState::Terminated(ExitReason::CommitsExhausted));
    }

    struct AlwaysNotFound;

    #[async_trait]
    impl TestExecutor for AlwaysNotFound {
        async fn run_test(&self, _commit: &Commit, _item: &WorkItem) -> TestResult {
            TestResult::NotFound
        }

        fn name(&self) -> &'static str {
            "not-found"
        }
    }

    #[tokio::test]
    async fn test_finished_test_counts_before_posting() {
        let coordinator = CoordinatorClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(50),
            RetryPolicy::default(),
        )
        .unwrap();
        let sequencer = CommitSequencer::new(commits_newest_first(&["C1", "C2"]), 1).unwrap();
        let mut work_loop =
            WorkLoop::new(sequencer, Arc::new(coordinator), Arc::new(AlwaysNotFound)).unwrap();

        let item = WorkItem::new("en", "Dog");
        let next = work_loop.step(LoopState::RunningTest(item.clone())).await;
        assert_eq!(
            next,
            LoopState::PostingResult {
                item,
                result: TestResult::NotFound
            }
        );
        assert_eq!(work_loop.sequencer().completed(), 1);
        assert_eq!(work_loop.sequencer().peek_current().unwrap().hash, "C1");
    }

    fn next_exit_code(state: &LoopState) -> Option<i32> {
        match state {
            LoopState::Terminated(reason) => Some(reason.exit_code()),
            _ => None,
        }
    }
}
