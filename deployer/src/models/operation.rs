//! Pending operation token

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;

/// Current token format version
pub const PENDING_OPERATION_VERSION: u32 = 1;

/// The only state carried from one invocation to the next.
///
/// Created by the trigger handler, echoed back by the scheduler on every
/// poll, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingOperation {
    version: u32,

    /// Build service build identifier
    pub build_id: String,

    /// Physical identifier the terminal result is reported under
    pub physical_resource_id: String,

    /// When the build was started
    pub started_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(
        build_id: impl Into<String>,
        physical_resource_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version: PENDING_OPERATION_VERSION,
            build_id: build_id.into(),
            physical_resource_id: physical_resource_id.into(),
            started_at,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Time since the build was started; zero if `started_at` lies after `now`
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Encode the token for the scheduler to persist
    pub fn encode(&self) -> Result<serde_json::Value, DeployerError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a token handed back by the scheduler
    pub fn decode(value: &serde_json::Value) -> Result<Self, DeployerError> {
        let version = value
            .get("Version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| DeployerError::InvalidOperation("missing Version".to_string()))?;

        if version != u64::from(PENDING_OPERATION_VERSION) {
            return Err(DeployerError::InvalidOperation(format!(
                "unsupported version {} (expected {})",
                version, PENDING_OPERATION_VERSION
            )));
        }

        let operation: PendingOperation = serde_json::from_value(value.clone())
            .map_err(|e| DeployerError::InvalidOperation(e.to_string()))?;

        if operation.build_id.is_empty() {
            return Err(DeployerError::InvalidOperation("empty BuildId".to_string()));
        }

        Ok(operation)
    }
}
