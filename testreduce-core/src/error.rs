//! Error types for the core domain

use thiserror::Error;

/// Core error type for domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("No further commits to test")]
    CommitsExhausted,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Create a validation error with a formatted message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp<S1: Into<String>, S2: Into<String>>(value: S1, message: S2) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Check if the commit stack ran dry
    pub fn is_commits_exhausted(&self) -> bool {
        matches!(self, Error::CommitsExhausted)
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::Serialization(_) => "serialization",
            Error::InvalidTimestamp { .. } => "invalid_timestamp",
            Error::CommitsExhausted => "commits_exhausted",
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let validation_err = Error::validation("empty title");
        assert_eq!(validation_err.category(), "validation");
        assert!(!validation_err.is_commits_exhausted());

        let exhausted = Error::CommitsExhausted;
        assert!(exhausted.is_commits_exhausted());
        assert_eq!(exhausted.category(), "commits_exhausted");
    }

    #[test]
    fn test_error_from_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let core_err: Error = json_err.into();
        assert_eq!(core_err.category(), "serialization");
    }

    #[test]
    fn test_error_display() {
        let err = Error::invalid_timestamp("yesterday", "premature end of input");
        let display_str = format!("{}", err);
        assert!(display_str.contains("Invalid timestamp"));
        assert!(display_str.contains("yesterday"));
    }
}
