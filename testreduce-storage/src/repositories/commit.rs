//! Commit repository implementation

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use testreduce_core::Commit;
use tracing::{debug, info};

/// Repository for commit entities
pub struct CommitRepository {
    pool: Pool<Sqlite>,
}

impl CommitRepository {
    /// Create a new commit repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Record a commit
    pub async fn create(&self, commit: &Commit) -> Result<()> {
        debug!("Creating commit: {}", commit.hash);

        sqlx::query("INSERT INTO commits (hash, timestamp) VALUES (?1, ?2)")
            .bind(&commit.hash)
            .bind(commit.ctime())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }

    /// All known commits, newest first.
    ///
    /// Ordered on the parsed timestamp; the column may hold both RFC 3339
    /// and SQL `DATETIME` text, which do not sort together as strings.
    pub async fn list_newest_first(&self) -> Result<Vec<Commit>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT hash, timestamp FROM commits")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut commits = rows
            .into_iter()
            .map(|(hash, timestamp)| {
                Commit::parse(hash, &timestamp).map_err(|e| Error::InvalidRow {
                    table: "commits".to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        info!("Loaded {} commits", commits.len());
        Ok(commits)
    }

    /// Count commits
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commits")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
