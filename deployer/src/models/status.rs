//! Build status models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Build status as reported by the build service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    InProgress,
    Succeeded,
    Failed,
    Fault,
    TimedOut,
    Stopped,
    /// Queued, provisioning or any other state this client does not know.
    /// Treated like a running build.
    #[serde(other)]
    Queued,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildStatus::Queued | BuildStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Queued => "QUEUED",
            BuildStatus::InProgress => "IN_PROGRESS",
            BuildStatus::Succeeded => "SUCCEEDED",
            BuildStatus::Failed => "FAILED",
            BuildStatus::Fault => "FAULT",
            BuildStatus::TimedOut => "TIMED_OUT",
            BuildStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one status query. Fetched fresh on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub status: BuildStatus,

    /// Values exported by the build
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,

    /// Trailing build log lines, oldest first
    #[serde(default)]
    pub log_tail: Vec<String>,
}

impl BuildReport {
    pub fn new(status: BuildStatus) -> Self {
        Self {
            status,
            outputs: BTreeMap::new(),
            log_tail: Vec::new(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_log_tail<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_tail = lines.into_iter().map(Into::into).collect();
        self
    }
}
