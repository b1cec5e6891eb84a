//! Database migration utilities

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Migration(e.to_string()))?;

    info!("Database migrations completed successfully");
    Ok(())
}
