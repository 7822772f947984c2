//! HTTP callback channel

use std::time::Duration;

use async_trait::async_trait;
use provisioning_protocol::CallbackPayload;
use reqwest::{header, Client};
use tracing::{debug, error};

use crate::callback::{CallbackChannel, CallbackTarget};
use crate::errors::DeployerError;

/// Delivers callbacks with a `PUT` of the JSON payload to the response URL
pub struct HttpCallbackChannel {
    client: Client,
}

impl HttpCallbackChannel {
    /// Create a new callback channel
    pub fn new(timeout: Duration) -> Result<Self, DeployerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackChannel for HttpCallbackChannel {
    async fn deliver(
        &self,
        target: &CallbackTarget,
        payload: &CallbackPayload,
    ) -> Result<(), DeployerError> {
        let body = serde_json::to_vec(payload)?;
        debug!(
            "PUT callback for request {} ({} bytes)",
            payload.request_id,
            body.len()
        );

        // Presigned URLs are signed without a content type
        let response = self
            .client
            .put(target.expose_url())
            .header(header::CONTENT_TYPE, "")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors carry the URL, which must not be logged
                DeployerError::ReportingError(e.without_url().to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(
                "Callback for request {} rejected: {} - {}",
                payload.request_id, status, body
            );
            return Err(DeployerError::ReportingError(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}
