//! Error types for storage operations

use thiserror::Error;

/// Storage layer error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Core domain error: {0}")]
    Core(#[from] testreduce_core::Error),

    #[error("Invalid row in {table}: {message}")]
    InvalidRow { table: String, message: String },
}

/// Convenience result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;
