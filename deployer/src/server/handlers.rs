//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use provisioning_protocol::{ErrorResponse, InvocationEnvelope};
use serde::Serialize;
use tracing::error;

use crate::errors::DeployerError;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "cdk-deployer".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Error returned to the scheduler
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: String) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.to_string(),
                message,
                details: None,
            },
        }
    }
}

impl From<DeployerError> for ApiError {
    fn from(err: DeployerError) -> Self {
        match err {
            // The scheduler redelivers on 5xx; polling again is safe
            DeployerError::ReportingError(_) | DeployerError::LedgerError(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "reporting_failed", err.to_string())
            }
            DeployerError::ConfigError(_)
            | DeployerError::ValidationError(_)
            | DeployerError::InvalidOperation(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_invocation", err.to_string())
            }
            other => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                other.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Invocation handler: one trigger or one poll per request
pub async fn invocation_handler(
    State(state): State<Arc<ServerState>>,
    envelope: Result<Json<InvocationEnvelope>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(envelope) = envelope.map_err(|rejection| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "malformed_envelope",
            rejection.body_text(),
        )
    })?;

    match state.deployer.invoke(&envelope).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(e) => {
            error!("Invocation for request {} failed: {}", envelope.request_id, e);
            Err(ApiError::from(e))
        }
    }
}
