//! Result repository implementation

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// Repository for stored round-trip results
pub struct ResultRepository {
    pool: Pool<Sqlite>,
}

impl ResultRepository {
    /// Create a new result repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Look up the stored result text for a page at a commit.
    ///
    /// Returns `None` when no row exists for the triple.
    pub async fn find_result(
        &self,
        commit_hash: &str,
        title: &str,
        prefix: &str,
    ) -> Result<Option<String>> {
        debug!(commit = commit_hash, title, prefix, "Looking up stored result");

        let result: Option<String> = sqlx::query_scalar(
            r#"
            SELECT results.result FROM results
            JOIN pages ON pages.id = results.page_id
            WHERE results.commit_hash = ?1 AND pages.title = ?2 AND pages.prefix = ?3
            "#,
        )
        .bind(commit_hash)
        .bind(title)
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result)
    }

    /// Insert a page if it is not known yet and return its id
    pub async fn ensure_page(&self, title: &str, prefix: &str) -> Result<i64> {
        sqlx::query(
            "INSERT INTO pages (title, prefix) VALUES (?1, ?2) ON CONFLICT (title, prefix) DO NOTHING",
        )
        .bind(title)
        .bind(prefix)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM pages WHERE title = ?1 AND prefix = ?2")
            .bind(title)
            .bind(prefix)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(id)
    }

    /// Store a result for a page at a commit, replacing any previous one
    pub async fn store(
        &self,
        commit_hash: &str,
        title: &str,
        prefix: &str,
        result: &str,
    ) -> Result<()> {
        let page_id = self.ensure_page(title, prefix).await?;
        debug!(commit = commit_hash, page_id, "Storing result");

        sqlx::query(
            r#"
            INSERT INTO results (page_id, commit_hash, result) VALUES (?1, ?2, ?3)
            ON CONFLICT (page_id, commit_hash) DO UPDATE SET result = excluded.result
            "#,
        )
        .bind(page_id)
        .bind(commit_hash)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    /// Count results
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
