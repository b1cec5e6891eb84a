//! On-demand diagnostic snapshots
//!
//! Sending `SIGUSR2` to a worker writes its current progress to a JSON file
//! in the configured scratch directory. This runs beside the work loop and
//! never influences it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use testreduce_core::ProgressSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::DiagnosticsConfig;
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSnapshot {
    pub worker_id: Uuid,
    pub pid: u32,
    pub written_at: DateTime<Utc>,
    pub progress: Option<ProgressSnapshot>,
}

impl DiagnosticSnapshot {
    pub fn capture(worker_id: Uuid, progress: Option<ProgressSnapshot>) -> Self {
        Self {
            worker_id,
            pid: std::process::id(),
            written_at: Utc::now(),
            progress,
        }
    }

    fn file_name(&self) -> String {
        format!(
            "testreduce-client-{}-{}.json",
            self.pid,
            self.written_at.timestamp_millis()
        )
    }
}

/// Write `snapshot` into `dir` and return the file path
pub fn write_snapshot(dir: &Path, snapshot: &DiagnosticSnapshot) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(snapshot.file_name());
    let body = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, body)?;
    Ok(path)
}

/// Listen for `SIGUSR2` and write a snapshot each time it arrives
#[cfg(unix)]
pub fn spawn_snapshot_listener(
    config: &DiagnosticsConfig,
    worker_id: Uuid,
    progress: watch::Receiver<Option<ProgressSnapshot>>,
) -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    if !config.enabled {
        return None;
    }

    let mut signals = match signal(SignalKind::user_defined2()) {
        Ok(signals) => signals,
        Err(e) => {
            error!(error = %e, "Failed to install SIGUSR2 handler");
            return None;
        }
    };
    let dir = config.snapshot_dir.clone();

    Some(tokio::spawn(async move {
        while signals.recv().await.is_some() {
            info!("SIGUSR2 received! Writing snapshot.");
            let snapshot = DiagnosticSnapshot::capture(worker_id, progress.borrow().clone());
            match write_snapshot(&dir, &snapshot) {
                Ok(path) => info!(path = %path.display(), "Diagnostic snapshot written"),
                Err(e) => error!(error = %e, "Failed to write diagnostic snapshot"),
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_snapshot_listener(
    _config: &DiagnosticsConfig,
    _worker_id: Uuid,
    _progress: watch::Receiver<Option<ProgressSnapshot>>,
) -> Option<JoinHandle<()>> {
    None
}
