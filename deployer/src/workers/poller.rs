//! Polling worker
//!
//! A local stand-in for the engine's scheduler: sends the trigger, then
//! re-invokes the deployer with the returned token on a fixed interval
//! until the result has been reported.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use provisioning_protocol::InvocationEnvelope;
use tracing::{debug, info, warn};

use crate::deploy::handler::Deployer;
use crate::errors::DeployerError;
use crate::models::result::InvocationResponse;

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Redelivery attempts after a failed callback
    pub max_redeliveries: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_redeliveries: 5,
        }
    }
}

/// Drive one lifecycle event to completion.
///
/// Returns the final response, or the last pending one if shut down first.
/// A failed callback is retried up to `max_redeliveries` times in a row,
/// whichever invocation produced it.
pub async fn run<S, F>(
    options: &Options,
    deployer: &Deployer,
    envelope: InvocationEnvelope,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<InvocationResponse, DeployerError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        "Poller worker starting for request {} ({})",
        envelope.request_id, envelope.request_type
    );

    let mut envelope = envelope;
    let mut response: Option<InvocationResponse> = None;
    let mut redeliveries = 0;

    loop {
        debug!("Invoking deployer for request {}...", envelope.request_id);

        match deployer.invoke(&envelope).await {
            Ok(next) => {
                redeliveries = 0;
                match next.pending_operation() {
                    Some(op) => envelope.pending_operation = Some(op.encode()?),
                    None => {
                        info!("Request {} complete", envelope.request_id);
                        return Ok(next);
                    }
                }
                response = Some(next);
            }
            // Triggers and polls are replay-safe through the ledger, so the
            // same envelope can simply be sent again.
            Err(DeployerError::ReportingError(e)) if redeliveries < options.max_redeliveries => {
                redeliveries += 1;
                warn!(
                    "Reporting request {} failed (attempt {}/{}): {}",
                    envelope.request_id, redeliveries, options.max_redeliveries, e
                );
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller worker shutting down...");
                return response.ok_or_else(|| {
                    DeployerError::ShutdownError(format!(
                        "request {} shut down before any response",
                        envelope.request_id
                    ))
                });
            }
            _ = sleep_fn(options.interval) => {
                // Continue with next invocation
            }
        }
    }
}
