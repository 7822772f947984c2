//! Completion poller
//!
//! One call, one status query. The poller never sleeps or loops; waiting
//! between polls is up to whoever calls it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::build::BuildServiceClient;
use crate::deploy::fsm::{FsmSettings, PollEvent, PollFsm, PollState};
use crate::models::operation::PendingOperation;
use crate::models::result::DeploymentResult;
use crate::models::status::BuildReport;

/// Data key carrying the build identifier on success
pub const BUILD_ID_KEY: &str = "BuildId";

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Poll again later with the same operation
    InProgress,

    /// Terminal result
    Done(DeploymentResult),
}

/// Completion poller
pub struct CompletionPoller {
    build_client: Arc<dyn BuildServiceClient>,
    settings: FsmSettings,
}

impl CompletionPoller {
    pub fn new(build_client: Arc<dyn BuildServiceClient>, settings: FsmSettings) -> Self {
        Self {
            build_client,
            settings,
        }
    }

    /// Check once whether the build behind `op` has finished
    pub async fn poll(&self, op: &PendingOperation) -> PollOutcome {
        self.poll_at(op, Utc::now()).await
    }

    /// Same as [`poll`](Self::poll) with an explicit current time
    pub async fn poll_at(&self, op: &PendingOperation, now: DateTime<Utc>) -> PollOutcome {
        let mut fsm = PollFsm::resume();
        let elapsed = op.elapsed(now);

        let mut report = None;
        let event = match self.build_client.get_build_status(&op.build_id).await {
            Ok(observed) => {
                let status = observed.status;
                report = Some(observed);
                PollEvent::StatusObserved(status)
            }
            Err(e) if e.is_transient() => {
                warn!("Status query for build {} failed, will retry: {}", op.build_id, e);
                PollEvent::QueryFailed(e.to_string())
            }
            Err(e) => {
                error!("Status query for build {} rejected: {}", op.build_id, e);
                PollEvent::QueryRejected(format!("status query failed: {}", e))
            }
        };

        let mut state = match fsm.process(event) {
            Ok(state) => state,
            Err(e) => return PollOutcome::Done(self.failure(op, &e.to_string(), None)),
        };

        if !state.is_done() && elapsed > self.settings.max_wait {
            state = match fsm.process(PollEvent::DeadlineExceeded) {
                Ok(state) => state,
                Err(e) => return PollOutcome::Done(self.failure(op, &e.to_string(), None)),
            };
        }

        match state {
            PollState::Started | PollState::Polling => {
                debug!(
                    "Build {} still in progress after {}s",
                    op.build_id,
                    elapsed.as_secs()
                );
                PollOutcome::InProgress
            }
            PollState::DoneSuccess => {
                info!("Build {} succeeded", op.build_id);
                let mut data: BTreeMap<String, String> = report
                    .map(|r| r.outputs)
                    .unwrap_or_default();
                data.insert(BUILD_ID_KEY.to_string(), op.build_id.clone());
                PollOutcome::Done(
                    DeploymentResult::success(op.physical_resource_id.clone()).with_data(data),
                )
            }
            PollState::DoneFailure => {
                let reason = fsm.error().unwrap_or("build failed");
                info!("Build {} failed: {}", op.build_id, reason);
                PollOutcome::Done(self.failure(op, reason, report.as_ref()))
            }
            PollState::DoneTimeout => {
                warn!(
                    "Build {} timed out after {}s",
                    op.build_id,
                    elapsed.as_secs()
                );
                let mut message = format!(
                    "Build {} timed out: not finished after {}s (limit {}s)",
                    op.build_id,
                    elapsed.as_secs(),
                    self.settings.max_wait.as_secs()
                );
                if let Some(last_error) = fsm.error() {
                    message.push_str(&format!("; last status query error: {}", last_error));
                }
                PollOutcome::Done(DeploymentResult::failure(
                    op.physical_resource_id.clone(),
                    message,
                ))
            }
        }
    }

    fn failure(
        &self,
        op: &PendingOperation,
        reason: &str,
        report: Option<&BuildReport>,
    ) -> DeploymentResult {
        let mut message = format!("Build {} failed: {}", op.build_id, reason);

        let tail = report.map(|r| r.log_tail.as_slice()).unwrap_or_default();
        let keep = tail.len().min(self.settings.log_tail_lines);
        if keep > 0 {
            message.push_str("\nLast log lines:\n");
            message.push_str(&tail[tail.len() - keep..].join("\n"));
        }

        DeploymentResult::failure(op.physical_resource_id.clone(), message)
    }
}
