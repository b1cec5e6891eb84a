//! Commit sequencing
//!
//! The sequencer owns the stack of commits still to be tested and the
//! progress against the current one. Commits arrive newest first and are
//! popped from the back, so the oldest untested revision is always next.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use testreduce_core::{Commit, CommitSequencer};
//!
//! let newest_first = vec![
//!     Commit::new("c2", Utc.with_ymd_and_hms(2014, 1, 2, 0, 0, 0).unwrap()).unwrap(),
//!     Commit::new("c1", Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap()).unwrap(),
//! ];
//! let mut sequencer = CommitSequencer::new(newest_first, 1).unwrap();
//!
//! assert_eq!(sequencer.advance_if_exhausted().unwrap().hash, "c1");
//! sequencer.record_completion();
//! assert_eq!(sequencer.advance_if_exhausted().unwrap().hash, "c2");
//! ```

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::{Commit, Error, Result};

/// Progress against the commit currently under test
#[derive(Debug, Clone)]
struct CommitProgress {
    commit: Commit,
    completed: u64,
    started: Instant,
}

impl CommitProgress {
    fn start(commit: Commit) -> Self {
        Self {
            commit,
            completed: 0,
            started: Instant::now(),
        }
    }
}

/// Read-only view of sequencer progress, used for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub commit: String,
    pub ctime: String,
    pub completed: u64,
    pub total_tests: u64,
    pub elapsed_secs: f64,
    pub remaining_commits: usize,
}

/// Ordered stack of commits plus per-commit test accounting
#[derive(Debug)]
pub struct CommitSequencer {
    pending: Vec<Commit>,
    progress: Option<CommitProgress>,
    total_tests: u64,
}

impl CommitSequencer {
    /// Create a sequencer from commits ordered newest first.
    ///
    /// `total_tests` is the number of completed tests after which the
    /// sequencer moves on to the next commit.
    pub fn new(commits_newest_first: Vec<Commit>, total_tests: u64) -> Result<Self> {
        if total_tests == 0 {
            return Err(Error::validation(
                "Total tests per commit must be greater than zero",
            ));
        }

        Ok(Self {
            pending: commits_newest_first,
            progress: None,
            total_tests,
        })
    }

    /// Return the commit under test, moving to the next one first if the
    /// current commit has seen `total_tests` completions.
    ///
    /// The first call pops the oldest commit. Running out of commits when a
    /// pop is needed is [`Error::CommitsExhausted`].
    pub fn advance_if_exhausted(&mut self) -> Result<Commit> {
        match self.progress.as_ref() {
            None => {
                let first = self.pending.pop().ok_or(Error::CommitsExhausted)?;
                info!(
                    commit = %first.hash,
                    remaining = self.pending.len(),
                    "Starting first commit"
                );
                self.progress = Some(CommitProgress::start(first));
            }
            Some(progress) if progress.completed >= self.total_tests => {
                let next = self.pending.pop().ok_or(Error::CommitsExhausted)?;
                info!(
                    commit = %progress.commit.hash,
                    completed = progress.completed,
                    elapsed_secs = progress.started.elapsed().as_secs_f64(),
                    "Finished commit"
                );
                info!(
                    commit = %next.hash,
                    remaining = self.pending.len(),
                    "Advancing to next commit"
                );
                self.progress = Some(CommitProgress::start(next));
            }
            Some(_) => {}
        }

        self.peek_current().cloned().ok_or(Error::CommitsExhausted)
    }

    /// The commit under test, without any side effects
    pub fn peek_current(&self) -> Option<&Commit> {
        self.progress.as_ref().map(|p| &p.commit)
    }

    /// Count one finished test against the current commit
    pub fn record_completion(&mut self) {
        if let Some(progress) = self.progress.as_mut() {
            progress.completed += 1;
            debug!(
                commit = %progress.commit.short_hash(),
                completed = progress.completed,
                total = self.total_tests,
                "Recorded test completion"
            );
        }
    }

    /// Tests completed against the current commit
    pub fn completed(&self) -> u64 {
        self.progress.as_ref().map_or(0, |p| p.completed)
    }

    pub fn total_tests(&self) -> u64 {
        self.total_tests
    }

    /// Commits not yet popped
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        self.progress.as_ref().map(|p| ProgressSnapshot {
            commit: p.commit.hash.clone(),
            ctime: p.commit.ctime(),
            completed: p.completed,
            total_tests: self.total_tests,
            elapsed_secs: p.started.elapsed().as_secs_f64(),
            remaining_commits: self.pending.len(),
        })
    }
}
