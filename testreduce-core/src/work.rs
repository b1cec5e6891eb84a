//! Work item handed out by the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// One test subject: a wiki prefix and a page title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub prefix: String,
    pub title: String,
}

impl WorkItem {
    pub fn new<S1: Into<String>, S2: Into<String>>(prefix: S1, title: S2) -> Self {
        Self {
            prefix: prefix.into(),
            title: title.into(),
        }
    }

    /// Parse the coordinator's `{"prefix": ..., "title": ...}` body
    pub fn from_json(body: &str) -> Result<Self> {
        let item: WorkItem = serde_json::from_str(body)?;
        if item.title.is_empty() {
            return Err(Error::validation("Work item title cannot be empty"));
        }
        Ok(item)
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.title)
    }
}
