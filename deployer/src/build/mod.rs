//! Build service client
//!
//! The deployer only ever does two things with the build service: start one
//! build per lifecycle event and read back the status of that build.
//! Implementations are injected into the trigger handler and the poller.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::BuildServiceError;
use crate::models::status::BuildReport;

/// Environment variable carrying the serialized deployment parameters
pub const PARAMETERS_VAR: &str = "PARAMETERS";

/// Environment variable carrying the target stack name
pub const STACK_NAME_VAR: &str = "STACKNAME";

/// Environment variable carrying the application entry point
pub const APP_LOCATION_VAR: &str = "CDK_APP_LOCATION";

/// Build environment override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl EnvironmentVariable {
    pub fn plaintext(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: "PLAINTEXT".to_string(),
        }
    }
}

/// Start-build call arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartBuildRequest {
    pub project_id: String,

    /// Parameters rendered as ` -c key=value` tokens
    pub parameter_string: String,

    /// Environment overrides, `PARAMETERS` included
    pub environment: Vec<EnvironmentVariable>,
}

impl StartBuildRequest {
    pub fn new(
        project_id: impl Into<String>,
        parameter_string: impl Into<String>,
        app_location: Option<&str>,
    ) -> Self {
        let parameter_string = parameter_string.into();
        let mut environment = vec![
            EnvironmentVariable::plaintext(PARAMETERS_VAR, parameter_string.clone()),
            // Resolved by the build step itself
            EnvironmentVariable::plaintext(STACK_NAME_VAR, ""),
        ];
        if let Some(location) = app_location {
            environment.push(EnvironmentVariable::plaintext(APP_LOCATION_VAR, location));
        }

        Self {
            project_id: project_id.into(),
            parameter_string,
            environment,
        }
    }
}

/// Build service client
#[async_trait]
pub trait BuildServiceClient: Send + Sync {
    /// Start a build and return its identifier
    async fn start_build(&self, request: &StartBuildRequest) -> Result<String, BuildServiceError>;

    /// Fetch the current status of a build.
    ///
    /// A query right after `start_build` may not see the build yet; that is
    /// reported as [`BuildServiceError::NotFound`].
    async fn get_build_status(&self, build_id: &str) -> Result<BuildReport, BuildServiceError>;
}
