//! Worker startup: wire storage, coordinator, executor and loop together

use std::sync::Arc;
use testreduce_core::CommitSequencer;
use testreduce_storage::StorageManager;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::{Config, ExecutorMode};
use crate::coordinator::{CoordinatorClient, RetryPolicy};
use crate::diagnostics;
use crate::executor::{LookupExecutor, RoundTripExecutor, TestExecutor};
use crate::worker::{ExitReason, WorkLoop};
use crate::{ClientError, Result};

/// Build the executor selected by the configuration
pub fn build_executor(config: &Config, storage: &StorageManager) -> Result<Arc<dyn TestExecutor>> {
    match config.executor.mode {
        ExecutorMode::Lookup => Ok(Arc::new(LookupExecutor::new(storage.results()))),
        ExecutorMode::Roundtrip => {
            let url = config.executor.transform_url.as_deref().ok_or_else(|| {
                ClientError::invalid_config("executor.transform_url is required in roundtrip mode")
            })?;
            Ok(Arc::new(RoundTripExecutor::new(url, config.executor.cutoff())?))
        }
    }
}

/// Load commits, then run the work loop until it terminates
pub async fn run_client(config: Config) -> Result<ExitReason> {
    config.validate()?;

    let storage = StorageManager::new(&config.database_config()).await?;
    let commits = storage.commits().list_newest_first().await?;
    if commits.is_empty() {
        error!("No commits found in storage, nothing to test");
        return Err(ClientError::NoCommits);
    }
    info!(
        commits = commits.len(),
        newest = %commits[0].hash,
        total_tests = config.work.total_tests,
        "Loaded commit list"
    );

    let sequencer = CommitSequencer::new(commits, config.work.total_tests)?;
    let coordinator = Arc::new(CoordinatorClient::new(
        &config.coordinator_url(),
        config.coordinator.request_timeout(),
        RetryPolicy::from(&config.work),
    )?);
    let executor = build_executor(&config, &storage)?;

    let (progress_tx, progress_rx) = watch::channel(None);
    let mut work_loop = WorkLoop::new(sequencer, coordinator, executor)?.with_progress(progress_tx);

    let listener = diagnostics::spawn_snapshot_listener(
        &config.diagnostics,
        work_loop.session().worker_id,
        progress_rx,
    );

    let reason = work_loop.run().await;

    if let Some(handle) = listener {
        handle.abort();
    }
    storage.close().await;

    Ok(reason)
}
