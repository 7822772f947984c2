//! Result reporter
//!
//! Delivers at least once. The ledger claims each request before sending,
//! so concurrent or repeated reports for the same request produce one
//! callback, and a replay after a failed delivery re-sends the stored result.

use std::sync::Arc;

use provisioning_protocol::{CallbackPayload, CallbackStatus};
use tracing::{error, info, warn};

use crate::callback::{CallbackChannel, CallbackTarget};
use crate::errors::DeployerError;
use crate::ledger::{Claim, DeliveryLedger};
use crate::models::request::RequestContext;
use crate::models::result::{Delivery, DeploymentResult, Outcome};

const TRUNCATION_MARKER: &str = "...";

/// Cut `reason` to at most `max_len` characters, marking the cut
pub fn truncate_reason(reason: &str, max_len: usize) -> String {
    if reason.chars().count() <= max_len {
        return reason.to_string();
    }
    let keep = max_len.saturating_sub(TRUNCATION_MARKER.len());
    let mut truncated: String = reason.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Build the callback payload for a terminal result
pub fn build_payload(
    context: &RequestContext,
    result: &DeploymentResult,
    max_reason_len: usize,
) -> CallbackPayload {
    let (status, reason) = match result.outcome {
        Outcome::Success => (CallbackStatus::Success, None),
        Outcome::Failure => (
            CallbackStatus::Failed,
            Some(truncate_reason(
                result.error_message.as_deref().unwrap_or("deployment failed"),
                max_reason_len,
            )),
        ),
    };

    CallbackPayload {
        status,
        reason,
        physical_resource_id: result.physical_resource_id.clone(),
        stack_id: context.stack_id.clone(),
        request_id: context.request_id.clone(),
        logical_resource_id: context.logical_resource_id.clone(),
        data: result.data.clone(),
    }
}

/// Result reporter
pub struct ResultReporter {
    channel: Arc<dyn CallbackChannel>,
    ledger: Arc<dyn DeliveryLedger>,
    max_reason_len: usize,
}

impl ResultReporter {
    pub fn new(
        channel: Arc<dyn CallbackChannel>,
        ledger: Arc<dyn DeliveryLedger>,
        max_reason_len: usize,
    ) -> Self {
        Self {
            channel,
            ledger,
            max_reason_len,
        }
    }

    /// Report a terminal result.
    ///
    /// The first result stored for a request is the one delivered, so a
    /// replay re-sends it even if this invocation computed another. Returns
    /// the result actually reported. Fails if the callback could not be
    /// delivered or another delivery for the request is in flight; the
    /// caller is expected to retry, which is safe.
    pub async fn report(
        &self,
        context: &RequestContext,
        target: &CallbackTarget,
        result: DeploymentResult,
    ) -> Result<(DeploymentResult, Delivery), DeployerError> {
        let request_id = &context.request_id;
        let result = match self.ledger.try_claim(request_id, &result).await? {
            Claim::Delivered(stored) => {
                info!("Callback for request {} already delivered, skipping", request_id);
                return Ok((stored, Delivery::Duplicate));
            }
            Claim::InFlight => {
                return Err(DeployerError::ReportingError(format!(
                    "callback for request {} is already being delivered",
                    request_id
                )));
            }
            Claim::Acquired(stored) => stored,
        };

        let payload = build_payload(context, &result, self.max_reason_len);

        if let Err(e) = self.channel.deliver(target, &payload).await {
            error!("Failed to deliver callback for request {}: {}", request_id, e);
            if let Err(release_err) = self.ledger.release(request_id).await {
                warn!(
                    "Could not release callback claim for request {}: {}",
                    request_id, release_err
                );
            }
            return Err(match e {
                DeployerError::ReportingError(_) => e,
                other => DeployerError::ReportingError(other.to_string()),
            });
        }

        info!(
            "Reported {:?} for request {} ({})",
            payload.status, request_id, payload.physical_resource_id
        );

        // Delivered either way; a missing record only risks a duplicate
        // the engine discards by request id.
        if let Err(e) = self.ledger.mark_delivered(request_id, &result).await {
            warn!(
                "Delivered callback for request {} but could not record it: {}",
                request_id, e
            );
        }

        Ok((result, Delivery::Delivered))
    }
}
