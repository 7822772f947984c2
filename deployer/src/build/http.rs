//! HTTP build service client

use std::time::Duration;

use http::StatusCode;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::build::{BuildServiceClient, EnvironmentVariable, StartBuildRequest};
use crate::errors::{BuildServiceError, DeployerError};
use crate::models::status::BuildReport;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartBuildBody<'a> {
    environment_variables: &'a [EnvironmentVariable],
}

#[derive(Debug, Deserialize)]
struct StartBuildResponse {
    id: String,
}

/// Build service client speaking JSON to a build gateway.
///
/// `POST {base}/projects/{project}/builds` starts a build,
/// `GET {base}/builds/{id}` reads its status.
pub struct HttpBuildClient {
    client: Client,
    base_url: Url,
}

impl HttpBuildClient {
    /// Create a new build service client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeployerError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DeployerError::ConfigError(format!("build service url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DeployerError::ConfigError(format!(
                "build service url cannot be a base: {}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BuildServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BuildServiceError::Protocol(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn classify(status: StatusCode, body: String) -> BuildServiceError {
    let detail = format!("{}: {}", status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => BuildServiceError::Throttled(detail),
        StatusCode::NOT_FOUND => BuildServiceError::NotFound(detail),
        s if s.is_server_error() => BuildServiceError::Unavailable(detail),
        _ => BuildServiceError::Rejected(detail),
    }
}

#[async_trait::async_trait]
impl BuildServiceClient for HttpBuildClient {
    async fn start_build(&self, request: &StartBuildRequest) -> Result<String, BuildServiceError> {
        let url = self.endpoint(&["projects", &request.project_id, "builds"])?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&StartBuildBody {
                environment_variables: &request.environment,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Start build failed: {} - {}", status, body);
            // An unknown project is not something a retry fixes
            return Err(match classify(status, body) {
                BuildServiceError::NotFound(detail) => BuildServiceError::Rejected(detail),
                other => other,
            });
        }

        let body: StartBuildResponse = response.json().await?;
        if body.id.is_empty() {
            return Err(BuildServiceError::Protocol("empty build id".to_string()));
        }
        Ok(body.id)
    }

    async fn get_build_status(&self, build_id: &str) -> Result<BuildReport, BuildServiceError> {
        let url = self.endpoint(&["builds", build_id])?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("Build status query failed: {} - {}", status, body);
            return Err(classify(status, body));
        }

        let report = response.json().await?;
        Ok(report)
    }
}
