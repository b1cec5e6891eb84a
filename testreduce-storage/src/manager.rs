//! Storage manager for coordinating database operations

use crate::{migrations, repositories::*, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub migrate_on_startup: bool,
}

impl DatabaseConfig {
    /// Single-connection in-memory database, used by tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
            migrate_on_startup: true,
        }
    }
}

/// Main storage manager coordinating all repositories
pub struct StorageManager {
    pool: Pool<Sqlite>,
    commits: Arc<CommitRepository>,
    results: Arc<ResultRepository>,
}

impl StorageManager {
    /// Create a new storage manager
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database: {}", redact_url(&config.url));

        let connect_opts = SqliteConnectOptions::from_str(&config.url)?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(5))
            .connect_with(connect_opts)
            .await?;

        info!("Database connection established");

        let manager = Self::from_pool(pool);
        if config.migrate_on_startup {
            manager.migrate().await?;
        }
        Ok(manager)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        let commits = Arc::new(CommitRepository::new(pool.clone()));
        let results = Arc::new(ResultRepository::new(pool.clone()));

        Self {
            pool,
            commits,
            results,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get commit repository
    pub fn commits(&self) -> Arc<CommitRepository> {
        self.commits.clone()
    }

    /// Get result repository
    pub fn results(&self) -> Arc<ResultRepository> {
        self.results.clone()
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Get database statistics
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let commits_count = self.commits.count().await?;
        let results_count = self.results.count().await?;

        Ok(DatabaseStats {
            commits_count,
            results_count,
        })
    }

    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub commits_count: i64,
    pub results_count: i64,
}

/// Strip credentials from a connection URL before logging it
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
