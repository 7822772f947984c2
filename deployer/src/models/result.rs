//! Terminal deployment results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::operation::PendingOperation;

/// Final outcome of a lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// Terminal result, constructed once per request and handed to the reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentResult {
    pub outcome: Outcome,

    #[serde(default)]
    pub data: BTreeMap<String, String>,

    pub physical_resource_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DeploymentResult {
    pub fn success(physical_resource_id: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            data: BTreeMap::new(),
            physical_resource_id: physical_resource_id.into(),
            error_message: None,
        }
    }

    pub fn failure(physical_resource_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure,
            data: BTreeMap::new(),
            physical_resource_id: physical_resource_id.into(),
            error_message: Some(message.into()),
        }
    }

    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = data;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// How a terminal result reached the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Callback sent by this invocation
    Delivered,
    /// A callback for the same request was already delivered
    Duplicate,
}

/// What an invocation hands back to its scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "State", rename_all = "PascalCase", rename_all_fields = "PascalCase")]
pub enum InvocationResponse {
    /// A build was started; poll again with the token
    Pending {
        physical_resource_id: String,
        pending_operation: PendingOperation,
    },

    /// The build has not finished; poll again with the same token
    InProgress { pending_operation: PendingOperation },

    /// A terminal result was reported
    Complete {
        result: DeploymentResult,
        delivery: Delivery,
    },
}

impl InvocationResponse {
    /// Token to hand back on the next invocation, if any
    pub fn pending_operation(&self) -> Option<&PendingOperation> {
        match self {
            InvocationResponse::Pending {
                pending_operation, ..
            }
            | InvocationResponse::InProgress { pending_operation } => Some(pending_operation),
            InvocationResponse::Complete { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, InvocationResponse::Complete { .. })
    }
}
