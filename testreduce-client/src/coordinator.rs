//! Coordinator HTTP client
//!
//! This is the only place that interprets coordinator status codes. The work
//! loop only ever sees a [`FetchAction`].

use reqwest::StatusCode;
use std::time::Duration;
use testreduce_core::{Commit, TestResult, WorkItem};
use tracing::{debug, info, warn};

use crate::config::WorkConfig;
use crate::Result;

/// Timing and retry bounds for coordinator requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Transport-level attempts per fetch before giving up on this cycle
    pub fetch_attempts: u32,
    /// Pause between transport-level attempts
    pub transport_retry_delay: Duration,
    /// Wait after the coordinator reports no work
    pub no_work_delay: Duration,
    /// Wait after any other failure
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            fetch_attempts: 10,
            transport_retry_delay: Duration::from_secs(1),
            no_work_delay: Duration::from_secs(30),
            error_delay: Duration::from_secs(15),
        }
    }
}

impl From<&WorkConfig> for RetryPolicy {
    fn from(work: &WorkConfig) -> Self {
        Self {
            fetch_attempts: work.fetch_attempts.max(1),
            transport_retry_delay: Duration::from_millis(work.transport_retry_delay_ms),
            no_work_delay: Duration::from_secs(work.no_work_delay_secs),
            error_delay: Duration::from_secs(work.error_delay_secs),
        }
    }
}

/// What the work loop should do after asking for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAction {
    /// Run the test for this item
    RunTest(WorkItem),
    /// Wait, then start a new cycle
    Retry(Duration),
    /// The coordinator refuses this client version; stop for good
    Abort,
}

/// HTTP client for the coordinator's work and result endpoints
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    http: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl CoordinatorClient {
    pub fn new(base_url: &str, request_timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("testreduce-client/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask for the next work item under `commit`.
    ///
    /// Never fails: every outcome, including transport errors, maps to an
    /// action.
    pub async fn fetch_work(&self, commit: &Commit) -> FetchAction {
        let (status, body) = match self.get_title(commit).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    error = %e,
                    attempts = self.policy.fetch_attempts,
                    "Coordinator unreachable, waiting {}s to resume",
                    self.policy.error_delay.as_secs()
                );
                return FetchAction::Retry(self.policy.error_delay);
            }
        };

        match status {
            StatusCode::OK => match WorkItem::from_json(&body) {
                Ok(item) => {
                    debug!(prefix = %item.prefix, title = %item.title, "Received work item");
                    FetchAction::RunTest(item)
                }
                Err(e) => {
                    warn!(error = %e, "Coordinator sent an unreadable work item");
                    FetchAction::Retry(self.policy.error_delay)
                }
            },
            StatusCode::NOT_FOUND => {
                info!(
                    "The coordinator doesn't have any work for us right now, waiting {}s",
                    self.policy.no_work_delay.as_secs()
                );
                FetchAction::Retry(self.policy.no_work_delay)
            }
            StatusCode::UPGRADE_REQUIRED => {
                warn!("Update required, exiting");
                FetchAction::Abort
            }
            other => {
                warn!(
                    status = other.as_u16(),
                    "Coordinator returned an error, waiting {}s to resume",
                    self.policy.error_delay.as_secs()
                );
                FetchAction::Retry(self.policy.error_delay)
            }
        }
    }

    /// `GET /title` with the body read in full, retrying transport failures
    /// (connect, timeout, truncated body) up to the policy bound
    async fn get_title(&self, commit: &Commit) -> Result<(StatusCode, String)> {
        let url = format!("{}/title", self.base_url);
        let ctime = commit.ctime();
        let mut attempt = 1;

        loop {
            let result = match self
                .http
                .get(&url)
                .query(&[("commit", commit.hash.as_str()), ("ctime", ctime.as_str())])
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    response.text().await.map(|body| (status, body))
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.policy.fetch_attempts => {
                    debug!(
                        error = %e,
                        attempt,
                        max_attempts = self.policy.fetch_attempts,
                        "Retrying work request"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.transport_retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// `POST /result/{title}/{prefix}` with the form-encoded result
    pub async fn submit_result(
        &self,
        commit: &Commit,
        item: &WorkItem,
        result: &TestResult,
    ) -> Result<StatusCode> {
        let url = result_url(&self.base_url, item);
        let wire = result.to_wire();
        let ctime = commit.ctime();
        let form = [
            ("results", wire.as_str()),
            ("commit", commit.hash.as_str()),
            ("ctime", ctime.as_str()),
        ];

        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        // Drain the body so the connection can be reused.
        response.bytes().await?;
        Ok(status)
    }
}

fn result_url(base_url: &str, item: &WorkItem) -> String {
    format!(
        "{}/result/{}/{}",
        base_url,
        urlencoding::encode(&item.title),
        urlencoding::encode(&item.prefix)
    )
}
