//! Error types for the deployer

use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Build service error: {0}")]
    BuildServiceError(#[from] BuildServiceError),

    #[error("Reporting error: {0}")]
    ReportingError(String),

    #[error("Ledger error: {0}")]
    LedgerError(String),

    #[error("Invalid pending operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DeployerError {
    fn from(err: anyhow::Error) -> Self {
        DeployerError::Internal(err.to_string())
    }
}

/// Errors returned by a build service client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildServiceError {
    /// The service refused the request (unknown project, access denied, quota)
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    /// Network failure, timeout or server-side error
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The build is not (yet) visible to the service
    #[error("build not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Protocol(String),
}

impl BuildServiceError {
    /// Whether a later attempt may succeed without any change on our side
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BuildServiceError::Throttled(_)
                | BuildServiceError::Unavailable(_)
                | BuildServiceError::NotFound(_)
        )
    }
}

impl From<reqwest::Error> for BuildServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BuildServiceError::Protocol(err.to_string())
        } else {
            BuildServiceError::Unavailable(err.to_string())
        }
    }
}
