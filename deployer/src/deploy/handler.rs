//! Invocation dispatcher
//!
//! Routes an envelope to the trigger handler or the poller and hands any
//! terminal result to the reporter. Build state travels in the pending
//! operation; the ledger only answers redelivered requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use provisioning_protocol::{InvocationEnvelope, RequestType};
use tracing::{debug, info, warn};

use crate::build::BuildServiceClient;
use crate::callback::{CallbackChannel, CallbackTarget};
use crate::deploy::fsm::FsmSettings;
use crate::deploy::poller::{CompletionPoller, PollOutcome};
use crate::deploy::reporter::ResultReporter;
use crate::deploy::trigger::{TriggerHandler, TriggerOutcome};
use crate::errors::DeployerError;
use crate::ledger::{DeliveryLedger, RequestRecord};
use crate::models::operation::PendingOperation;
use crate::models::request::{DeploymentRequest, RequestContext};
use crate::models::result::{DeploymentResult, InvocationResponse};

/// Deployer options
#[derive(Debug, Clone)]
pub struct DeployerOptions {
    /// Poll settings
    pub fsm_settings: FsmSettings,

    /// Maximum length of a reported failure reason
    pub max_reason_len: usize,

    /// Callback endpoint for envelopes without a ResponseURL
    pub default_callback_endpoint: Option<String>,
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self {
            fsm_settings: FsmSettings::default(),
            max_reason_len: 1024,
            default_callback_endpoint: None,
        }
    }
}

/// Entry point for every invocation
pub struct Deployer {
    trigger: TriggerHandler,
    poller: CompletionPoller,
    reporter: ResultReporter,
    ledger: Arc<dyn DeliveryLedger>,
    default_callback: Option<CallbackTarget>,
}

impl Deployer {
    pub fn new(
        build_client: Arc<dyn BuildServiceClient>,
        channel: Arc<dyn CallbackChannel>,
        ledger: Arc<dyn DeliveryLedger>,
        options: DeployerOptions,
    ) -> Self {
        Self {
            trigger: TriggerHandler::new(build_client.clone()),
            poller: CompletionPoller::new(build_client, options.fsm_settings),
            reporter: ResultReporter::new(channel, ledger.clone(), options.max_reason_len),
            ledger,
            default_callback: options.default_callback_endpoint.map(CallbackTarget::new),
        }
    }

    /// Handle one invocation
    pub async fn invoke(
        &self,
        envelope: &InvocationEnvelope,
    ) -> Result<InvocationResponse, DeployerError> {
        self.invoke_at(envelope, Utc::now()).await
    }

    /// Handle one invocation with an explicit current time
    pub async fn invoke_at(
        &self,
        envelope: &InvocationEnvelope,
        now: DateTime<Utc>,
    ) -> Result<InvocationResponse, DeployerError> {
        // Checked first: a build whose result cannot be reported must not start
        let target = self.resolve_target(envelope)?;
        let request = DeploymentRequest::from(envelope);
        let request_id = &request.context.request_id;

        // A redelivered request never starts a second build
        match self.ledger.get(request_id).await? {
            Some(RequestRecord::Reporting { result, .. })
            | Some(RequestRecord::Delivered { result }) => {
                info!("Request {} already has a result, reporting it again", request_id);
                return self.complete(&request.context, &target, result).await;
            }
            Some(RequestRecord::Started { operation }) if !envelope.is_poll() => {
                info!(
                    "Trigger for request {} redelivered, build {} already started",
                    request_id, operation.build_id
                );
                return Ok(InvocationResponse::Pending {
                    physical_resource_id: operation.physical_resource_id.clone(),
                    pending_operation: operation,
                });
            }
            _ => {}
        }

        let token = match &envelope.pending_operation {
            Some(token) if request.request_type != RequestType::Delete => token,
            _ => {
                debug!(
                    "Trigger {} for request {}",
                    request.request_type, request.context.request_id
                );
                return match self.trigger.handle_at(&request, now).await {
                    TriggerOutcome::Pending(op) => {
                        if let Err(e) = self.ledger.record_started(request_id, &op).await {
                            warn!(
                                "Started build {} for request {} but could not record it: {}",
                                op.build_id, request_id, e
                            );
                        }
                        Ok(InvocationResponse::Pending {
                            physical_resource_id: op.physical_resource_id.clone(),
                            pending_operation: op,
                        })
                    }
                    TriggerOutcome::Done(result) => {
                        self.complete(&request.context, &target, result).await
                    }
                };
            }
        };

        let op = match PendingOperation::decode(token) {
            Ok(op) => op,
            Err(e) => {
                warn!(
                    "Unusable pending operation for request {}: {}",
                    request.context.request_id, e
                );
                let physical_resource_id = request
                    .physical_resource_id
                    .clone()
                    .unwrap_or_else(|| request.context.logical_resource_id.clone());
                let result = DeploymentResult::failure(physical_resource_id, e.to_string());
                return self.complete(&request.context, &target, result).await;
            }
        };

        debug!(
            "Poll build {} for request {}",
            op.build_id, request.context.request_id
        );
        match self.poller.poll_at(&op, now).await {
            PollOutcome::InProgress => Ok(InvocationResponse::InProgress {
                pending_operation: op,
            }),
            PollOutcome::Done(result) => self.complete(&request.context, &target, result).await,
        }
    }

    async fn complete(
        &self,
        context: &RequestContext,
        target: &CallbackTarget,
        result: DeploymentResult,
    ) -> Result<InvocationResponse, DeployerError> {
        let (result, delivery) = self.reporter.report(context, target, result).await?;
        Ok(InvocationResponse::Complete { result, delivery })
    }

    fn resolve_target(&self, envelope: &InvocationEnvelope) -> Result<CallbackTarget, DeployerError> {
        match (&envelope.response_url, &self.default_callback) {
            (Some(url), _) if !url.is_empty() => Ok(CallbackTarget::new(url.clone())),
            (_, Some(default)) => Ok(default.clone()),
            _ => Err(DeployerError::ConfigError(format!(
                "request {} has no ResponseURL and no default callback endpoint is configured",
                envelope.request_id
            ))),
        }
    }
}
