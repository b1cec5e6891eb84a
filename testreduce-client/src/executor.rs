//! Test executors
//!
//! An executor turns a work item into a [`TestResult`]. Executors never fail:
//! anything that goes wrong is captured in a `TestResult::Error`, which the
//! work loop reports before shutting the worker down.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use testreduce_core::{Commit, ErrorKind, TestResult, WorkItem};
use testreduce_storage::repositories::ResultRepository;
use tracing::{debug, error};

use crate::Result;

/// Produces a result for one work item
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// Run (or look up) the test for `item` at `commit`
    async fn run_test(&self, commit: &Commit, item: &WorkItem) -> TestResult;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Reads previously computed results from the shared database
pub struct LookupExecutor {
    results: Arc<ResultRepository>,
}

impl LookupExecutor {
    pub fn new(results: Arc<ResultRepository>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl TestExecutor for LookupExecutor {
    async fn run_test(&self, commit: &Commit, item: &WorkItem) -> TestResult {
        match self
            .results
            .find_result(&commit.hash, &item.title, &item.prefix)
            .await
        {
            Ok(Some(text)) => TestResult::Report(text),
            Ok(None) => {
                debug!(
                    commit = %commit.short_hash(),
                    prefix = %item.prefix,
                    title = %item.title,
                    "No stored result"
                );
                TestResult::NotFound
            }
            Err(e) => {
                error!(
                    commit = %commit.hash,
                    prefix = %item.prefix,
                    title = %item.title,
                    error = %e,
                    "Stored result lookup failed"
                );
                TestResult::error(ErrorKind::Storage, e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "lookup"
    }
}

/// Asks the external transform service to round-trip a page
pub struct RoundTripExecutor {
    http: reqwest::Client,
    transform_url: String,
    cutoff: Duration,
}

impl RoundTripExecutor {
    pub fn new(transform_url: &str, cutoff: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("testreduce-client/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            transform_url: transform_url.trim_end_matches('/').to_string(),
            cutoff,
        })
    }

    fn round_trip_url(&self, item: &WorkItem) -> String {
        format!(
            "{}/_rt/{}/{}",
            self.transform_url,
            urlencoding::encode(&item.prefix),
            urlencoding::encode(&item.title)
        )
    }

    async fn round_trip(&self, item: &WorkItem) -> TestResult {
        let response = match self.http.get(self.round_trip_url(item)).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_transport_error(&e),
        };

        if status.is_success() {
            TestResult::Report(body)
        } else {
            TestResult::error(
                ErrorKind::Engine,
                format!("transform service returned {}: {}", status, body.trim()),
            )
        }
    }
}

#[async_trait]
impl TestExecutor for RoundTripExecutor {
    async fn run_test(&self, _commit: &Commit, item: &WorkItem) -> TestResult {
        let result = match tokio::time::timeout(self.cutoff, self.round_trip(item)).await {
            Ok(result) => result,
            Err(_) => TestResult::error(
                ErrorKind::Timeout,
                format!("round-trip exceeded {}s", self.cutoff.as_secs()),
            ),
        };

        if let TestResult::Error { kind, message } = &result {
            error!(
                prefix = %item.prefix,
                title = %item.title,
                kind = %kind,
                "ERROR in {}: {}",
                item,
                message
            );
        }
        result
    }

    fn name(&self) -> &'static str {
        "roundtrip"
    }
}

fn classify_transport_error(e: &reqwest::Error) -> TestResult {
    let kind = if e.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Transport
    };
    TestResult::error(kind, e.to_string())
}
