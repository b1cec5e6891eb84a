//! Error types for the worker client

use thiserror::Error;

/// Errors surfaced while setting up or talking to collaborators.
///
/// The work loop itself never returns these; it converts them into retries
/// or error results.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] testreduce_storage::Error),

    #[error("Core domain error: {0}")]
    Core(#[from] testreduce_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No commits found in storage")]
    NoCommits,
}

impl ClientError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        ClientError::InvalidConfig(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
