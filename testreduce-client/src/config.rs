//! Configuration management for the worker client
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file, then `TESTREDUCE_*` environment variables (sections separated by
//! `__`, e.g. `TESTREDUCE_COORDINATOR__PORT`). Command line flags are applied
//! on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use testreduce_storage::DatabaseConfig;

use crate::{ClientError, Result};

/// Expected size of the test corpus for one commit
pub const DEFAULT_TOTAL_TESTS: u64 = 160_607;

const DEFAULT_CONFIG_FILE: &str = "config/client";
const ENV_PREFIX: &str = "TESTREDUCE";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub coordinator: CoordinatorConfig,
    pub database: DatabaseSettings,
    pub work: WorkConfig,
    pub executor: ExecutorConfig,
    pub logging: LoggingConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Where the coordinator lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

/// Results database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub migrate_on_startup: bool,
}

/// Work loop pacing and per-commit accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkConfig {
    pub total_tests: u64,
    pub fetch_attempts: u32,
    pub transport_retry_delay_ms: u64,
    pub no_work_delay_secs: u64,
    pub error_delay_secs: u64,
}

/// How results are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Read previously computed results from the database
    Lookup,
    /// Ask the transform service to run the round-trip
    Roundtrip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub mode: ExecutorMode,
    pub transform_url: Option<String>,
    pub cutoff_secs: u64,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub snapshot_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig {
                host: "localhost".to_string(),
                port: 8001,
                request_timeout_secs: 60,
            },
            database: DatabaseSettings {
                url: "sqlite:./testreduce.db".to_string(),
                max_connections: Some(5),
                migrate_on_startup: false,
            },
            work: WorkConfig {
                total_tests: DEFAULT_TOTAL_TESTS,
                fetch_attempts: 10,
                transport_retry_delay_ms: 1000,
                no_work_delay_secs: 30,
                error_delay_secs: 15,
            },
            executor: ExecutorConfig {
                mode: ExecutorMode::Lookup,
                transform_url: None,
                cutoff_secs: 600,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
                directory: None,
            },
            diagnostics: DiagnosticsConfig {
                enabled: true,
                snapshot_dir: PathBuf::from("/tmp"),
            },
        }
    }
}

impl Config {
    /// Load configuration from the default file location and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        Self::build(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    /// Load configuration from an explicit file plus environment
    pub fn load_from_file(path: &str) -> std::result::Result<Self, config::ConfigError> {
        Self::build(config::File::with_name(path).required(true))
    }

    fn build<S>(file: S) -> std::result::Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = Config::default();
        let settings = config::Config::builder()
            .set_default("coordinator.host", defaults.coordinator.host)?
            .set_default("coordinator.port", defaults.coordinator.port as i64)?
            .set_default(
                "coordinator.request_timeout_secs",
                defaults.coordinator.request_timeout_secs as i64,
            )?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", 5_i64)?
            .set_default(
                "database.migrate_on_startup",
                defaults.database.migrate_on_startup,
            )?
            .set_default("work.total_tests", defaults.work.total_tests as i64)?
            .set_default("work.fetch_attempts", defaults.work.fetch_attempts as i64)?
            .set_default(
                "work.transport_retry_delay_ms",
                defaults.work.transport_retry_delay_ms as i64,
            )?
            .set_default(
                "work.no_work_delay_secs",
                defaults.work.no_work_delay_secs as i64,
            )?
            .set_default("work.error_delay_secs", defaults.work.error_delay_secs as i64)?
            .set_default("executor.mode", "lookup")?
            .set_default("executor.cutoff_secs", defaults.executor.cutoff_secs as i64)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", "pretty")?
            .set_default("diagnostics.enabled", defaults.diagnostics.enabled)?
            .set_default(
                "diagnostics.snapshot_dir",
                defaults.diagnostics.snapshot_dir.to_string_lossy().to_string(),
            )?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Reject settings the work loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.coordinator.host.trim().is_empty() {
            return Err(ClientError::invalid_config("coordinator.host cannot be empty"));
        }
        if self.work.total_tests == 0 {
            return Err(ClientError::invalid_config(
                "work.total_tests must be greater than zero",
            ));
        }
        if self.work.fetch_attempts == 0 {
            return Err(ClientError::invalid_config(
                "work.fetch_attempts must be at least 1",
            ));
        }
        if self.executor.mode == ExecutorMode::Roundtrip && self.executor.transform_url.is_none()
        {
            return Err(ClientError::invalid_config(
                "executor.transform_url is required in roundtrip mode",
            ));
        }
        if self.executor.cutoff_secs == 0 {
            return Err(ClientError::invalid_config(
                "executor.cutoff_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Base URL of the coordinator, without a trailing slash
    pub fn coordinator_url(&self) -> String {
        format!("http://{}:{}", self.coordinator.host, self.coordinator.port)
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            migrate_on_startup: self.database.migrate_on_startup,
        }
    }
}

impl CoordinatorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ExecutorConfig {
    pub fn cutoff(&self) -> Duration {
        Duration::from_secs(self.cutoff_secs)
    }
}
