//! Test result representation
//!
//! Every test cycle ends in exactly one [`TestResult`], including cycles where
//! the executor failed. Failures are carried as an error payload so they can
//! be reported to the coordinator like any other result.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong while producing a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The round-trip did not finish within the cutoff
    Timeout,
    /// The transform service could not be reached
    Transport,
    /// The transform service answered with a failure
    Engine,
    /// Persisted results could not be read
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Engine => "EngineError",
            ErrorKind::Storage => "StorageError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    /// Serialized round-trip report
    Report(String),
    /// No stored result exists for this commit and page
    NotFound,
    /// The test could not be completed
    Error { kind: ErrorKind, message: String },
}

impl TestResult {
    pub fn error<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        TestResult::Error {
            kind,
            message: message.into(),
        }
    }

    /// Whether the worker must exit once this result has been reported
    pub fn is_fatal(&self) -> bool {
        matches!(self, TestResult::Error { .. })
    }

    /// Textual form submitted as the `results` field.
    ///
    /// `NotFound` stays an empty string so coordinators that predate the
    /// distinction see the same payload as before.
    pub fn to_wire(&self) -> String {
        match self {
            TestResult::Report(text) => text.clone(),
            TestResult::NotFound => String::new(),
            TestResult::Error { kind, message } => format!(
                "<error type=\"{}\">{}</error>",
                kind,
                html_escape::encode_text(message)
            ),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestResult::Report(_) => "report",
            TestResult::NotFound => "not_found",
            TestResult::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_forms() {
        assert_eq!(
            TestResult::Report("<testsuite/>".into()).to_wire(),
            "<testsuite/>"
        );
        assert_eq!(TestResult::NotFound.to_wire(), "");
        assert_eq!(
            TestResult::error(ErrorKind::Timeout, "took > 600s").to_wire(),
            "<error type=\"TimeoutError\">took &gt; 600s</error>"
        );
    }

    #[test]
    fn test_only_errors_are_fatal() {
        assert!(!TestResult::Report(String::new()).is_fatal());
        assert!(!TestResult::NotFound.is_fatal());
        assert!(TestResult::error(ErrorKind::Storage, "db gone").is_fatal());
    }
}
