//! Trigger handler
//!
//! Turns a lifecycle event into at most one started build. Start calls are
//! never retried here: a second attempt could leave two builds running for
//! the same event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use provisioning_protocol::RequestType;
use tracing::{error, info, warn};

use crate::build::{BuildServiceClient, StartBuildRequest};
use crate::deploy::params::serialize_parameters;
use crate::models::operation::PendingOperation;
use crate::models::request::DeploymentRequest;
use crate::models::result::DeploymentResult;
use crate::utils::generate_uuid;

/// What the trigger handler decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A build was started and must be polled
    Pending(PendingOperation),

    /// Nothing to wait for
    Done(DeploymentResult),
}

/// Fresh physical identifier for a newly created resource
pub fn new_physical_id(logical_resource_id: &str) -> String {
    format!("{}-{}", logical_resource_id, generate_uuid())
}

/// Trigger handler
pub struct TriggerHandler {
    build_client: Arc<dyn BuildServiceClient>,
}

impl TriggerHandler {
    pub fn new(build_client: Arc<dyn BuildServiceClient>) -> Self {
        Self { build_client }
    }

    /// Handle a lifecycle event
    pub async fn handle(&self, request: &DeploymentRequest) -> TriggerOutcome {
        self.handle_at(request, Utc::now()).await
    }

    /// Handle a lifecycle event, stamping a started build with `now`
    pub async fn handle_at(&self, request: &DeploymentRequest, now: DateTime<Utc>) -> TriggerOutcome {
        let context = &request.context;
        match request.request_type {
            RequestType::Create => {
                let physical_resource_id = new_physical_id(&context.logical_resource_id);
                info!(
                    "Create {} for request {}: physical id {}",
                    context.logical_resource_id, context.request_id, physical_resource_id
                );
                self.start(request, physical_resource_id, now).await
            }
            RequestType::Update => match &request.physical_resource_id {
                Some(physical_resource_id) => {
                    info!(
                        "Update {} for request {}",
                        physical_resource_id, context.request_id
                    );
                    self.start(request, physical_resource_id.clone(), now).await
                }
                None => {
                    warn!(
                        "Update for request {} carries no physical resource id",
                        context.request_id
                    );
                    TriggerOutcome::Done(DeploymentResult::failure(
                        context.logical_resource_id.clone(),
                        "Update request carries no physical resource id",
                    ))
                }
            },
            RequestType::Delete => {
                // Deployed artifacts are not torn down by the build trigger
                let physical_resource_id = request
                    .physical_resource_id
                    .clone()
                    .unwrap_or_else(|| context.logical_resource_id.clone());
                info!(
                    "Delete {} for request {}: no build started",
                    physical_resource_id, context.request_id
                );
                TriggerOutcome::Done(DeploymentResult::success(physical_resource_id))
            }
        }
    }

    async fn start(
        &self,
        request: &DeploymentRequest,
        physical_resource_id: String,
        now: DateTime<Utc>,
    ) -> TriggerOutcome {
        if request.build_project_id.is_empty() {
            return TriggerOutcome::Done(DeploymentResult::failure(
                physical_resource_id,
                "BuildProjectId must not be empty",
            ));
        }

        let parameter_string = match serialize_parameters(&request.parameters) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(
                    "Rejecting parameters for request {}: {}",
                    request.context.request_id, e
                );
                return TriggerOutcome::Done(DeploymentResult::failure(
                    physical_resource_id,
                    e.to_string(),
                ));
            }
        };

        let start = StartBuildRequest::new(
            &request.build_project_id,
            parameter_string,
            request.app_location.as_deref(),
        );

        match self.build_client.start_build(&start).await {
            Ok(build_id) => {
                info!(
                    "Started build {} in project {} ({} parameters)",
                    build_id,
                    request.build_project_id,
                    request.parameters.len()
                );
                TriggerOutcome::Pending(PendingOperation::new(build_id, physical_resource_id, now))
            }
            Err(e) => {
                error!(
                    "Failed to start build in project {}: {}",
                    request.build_project_id, e
                );
                TriggerOutcome::Done(DeploymentResult::failure(
                    physical_resource_id,
                    format!(
                        "Failed to start build in project {}: {}",
                        request.build_project_id, e
                    ),
                ))
            }
        }
    }
}
