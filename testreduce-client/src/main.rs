use anyhow::Result;
use clap::Parser;
use testreduce_client::{
    config::{Config, ExecutorMode, LogFormat},
    logging::init_tracing,
    runner::run_client,
};
use tracing::{error, info};

/// Worker client for distributed round-trip regression testing
#[derive(Parser)]
#[command(name = "testreduce-client")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long)]
    config: Option<String>,

    /// Coordinator host
    #[arg(long)]
    host: Option<String>,

    /// Coordinator port
    #[arg(long)]
    port: Option<u16>,

    /// Results database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Run schema migrations on startup
    #[arg(long)]
    migrate: bool,

    /// How results are produced
    #[arg(long, value_enum)]
    mode: Option<ExecutorMode>,

    /// Transform service URL (roundtrip mode)
    #[arg(long)]
    transform_url: Option<String>,

    /// Seconds to wait for a round-trip result
    #[arg(long)]
    cutoff_secs: Option<u64>,

    /// Completed tests after which the next commit is started
    #[arg(long)]
    total_tests: Option<u64>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Directory for rolling log files
    #[arg(long)]
    log_dir: Option<std::path::PathBuf>,
}

impl Cli {
    fn apply_overrides(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.coordinator.host = host;
        }
        if let Some(port) = self.port {
            config.coordinator.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if self.migrate {
            config.database.migrate_on_startup = true;
        }
        if let Some(mode) = self.mode {
            config.executor.mode = mode;
        }
        if let Some(url) = self.transform_url {
            config.executor.transform_url = Some(url);
        }
        if let Some(cutoff) = self.cutoff_secs {
            config.executor.cutoff_secs = cutoff;
        }
        if let Some(total) = self.total_tests {
            config.work.total_tests = total;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(dir) = self.log_dir {
            config.logging.directory = Some(dir);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);

    let guard = init_tracing(&config.logging)?;

    info!("Starting testreduce client");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Coordinator: {}", config.coordinator_url());
    info!("Executor mode: {:?}", config.executor.mode);

    let reason = match run_client(config).await {
        Ok(reason) => reason,
        Err(e) => {
            error!(error = %e, "Worker failed to start");
            drop(guard);
            return Err(e.into());
        }
    };

    let code = reason.exit_code();
    info!(exit_code = code, "Exiting: {}", reason);
    drop(guard);
    std::process::exit(code);
}
