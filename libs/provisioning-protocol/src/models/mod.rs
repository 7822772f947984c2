//! API models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle transition requested by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestType::Create => write!(f, "Create"),
            RequestType::Update => write!(f, "Update"),
            RequestType::Delete => write!(f, "Delete"),
        }
    }
}

/// A single named build parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered build parameters.
///
/// Accepts either a list of `{"Key", "Value"}` objects or a plain object;
/// object key order is kept as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Parameters(pub Vec<Parameter>);

impl Parameters {
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters(
            iter.into_iter()
                .map(|(k, v)| Parameter::new(k, v))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<Parameter>),
            Map(serde_json::Map<String, serde_json::Value>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::List(list) => Ok(Parameters(list)),
            Repr::Map(map) => map
                .into_iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => Ok(Parameter::new(key, s)),
                    serde_json::Value::Number(n) => Ok(Parameter::new(key, n.to_string())),
                    serde_json::Value::Bool(b) => Ok(Parameter::new(key, b.to_string())),
                    other => Err(serde::de::Error::custom(format!(
                        "parameter {} must be a scalar, got {}",
                        key, other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Parameters),
        }
    }
}

/// Properties of the custom resource as declared in the template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    /// Build project to start
    #[serde(alias = "ProjectName")]
    pub build_project_id: String,

    /// Named deployment parameters
    #[serde(default)]
    pub parameters: Parameters,

    /// Location of the application entry point inside the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_location: Option<String>,
}

/// Invocation envelope delivered by the engine or its scheduler.
///
/// A trigger carries no `PendingOperation`; a poll echoes back the token
/// returned by the previous invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationEnvelope {
    pub request_type: RequestType,

    pub request_id: String,

    pub stack_id: String,

    pub logical_resource_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,

    /// Presigned callback URL
    #[serde(rename = "ResponseURL", default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<String>,

    pub resource_properties: ResourceProperties,

    /// Opaque pending-operation token from a previous invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_operation: Option<serde_json::Value>,
}

impl InvocationEnvelope {
    /// Whether this envelope resumes an already started build
    pub fn is_poll(&self) -> bool {
        self.pending_operation.is_some()
    }
}

/// Terminal status reported to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallbackStatus {
    Success,
    Failed,
}

/// Callback payload sent to the engine exactly once per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackPayload {
    pub status: CallbackStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub physical_resource_id: String,

    pub stack_id: String,

    pub request_id: String,

    pub logical_resource_id: String,

    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
