//! Commit model
//!
//! A commit is an opaque revision hash paired with the time it was made.
//! Commits are read once from storage and never change afterwards.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Timestamp layout used by SQL `DATETIME` columns
const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A source revision under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
}

impl Commit {
    /// Create a commit, rejecting an empty hash
    pub fn new<S: Into<String>>(hash: S, timestamp: DateTime<Utc>) -> Result<Self> {
        let hash = hash.into();
        if hash.trim().is_empty() {
            return Err(Error::validation("Commit hash cannot be empty"));
        }
        Ok(Self { hash, timestamp })
    }

    /// Build a commit from a stored timestamp string.
    ///
    /// Accepts RFC 3339 (`2013-09-09T18:47:37.000Z`) as well as the plain
    /// `2013-09-09 18:47:37` form SQL engines hand back, which is read as UTC.
    pub fn parse<S: Into<String>>(hash: S, timestamp: &str) -> Result<Self> {
        Self::new(hash, parse_timestamp(timestamp)?)
    }

    /// The `ctime` value sent to the coordinator alongside the hash
    pub fn ctime(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Abbreviated hash for log lines
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(10)
            .map(|(idx, _)| idx)
            .unwrap_or(self.hash.len());
        &self.hash[..end]
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hash, self.ctime())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, SQL_DATETIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::invalid_timestamp(value, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ctime_matches_iso_millis() {
        let ts = Utc.with_ymd_and_hms(2013, 9, 9, 18, 47, 37).unwrap();
        let commit = Commit::new("0b5db8b91bfdeb0a304b372dd8dda123b3fd1ab6", ts).unwrap();
        assert_eq!(commit.ctime(), "2013-09-09T18:47:37.000Z");
        assert_eq!(commit.short_hash(), "0b5db8b91b");
    }

    #[test]
    fn test_parse_accepts_rfc3339_and_sql_datetime() {
        let rfc = Commit::parse("abc", "2013-09-09T20:47:37+02:00").unwrap();
        let sql = Commit::parse("abc", "2013-09-09 18:47:37").unwrap();
        assert_eq!(rfc.timestamp, sql.timestamp);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Commit::parse("abc", "last tuesday").unwrap_err();
        assert_eq!(err.category(), "invalid_timestamp");
    }

    #[test]
    fn test_empty_hash_rejected() {
        assert!(Commit::new("  ", Utc::now()).is_err());
    }
}
