//! Finite State Machine for build completion polling

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::DeployerError;
use crate::models::status::BuildStatus;

/// Poll settings
#[derive(Debug, Clone)]
pub struct FsmSettings {
    /// Longest a build may run before it is reported as timed out
    pub max_wait: Duration,

    /// Trailing log lines kept in failure messages
    pub log_tail_lines: usize,
}

impl Default for FsmSettings {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(3600),
            log_tail_lines: 20,
        }
    }
}

/// Build polling state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollState {
    /// Build started, nothing observed yet in this invocation
    Started,

    /// Build still running
    Polling,

    /// Build succeeded
    DoneSuccess,

    /// Build ended in a non-success status, or its status could not be read
    DoneFailure,

    /// Gave up waiting
    DoneTimeout,
}

impl PollState {
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            PollState::DoneSuccess | PollState::DoneFailure | PollState::DoneTimeout
        )
    }
}

/// Polling event
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// Status query answered
    StatusObserved(BuildStatus),

    /// Status query failed in a way a later poll may not
    QueryFailed(String),

    /// Status query failed for good
    QueryRejected(String),

    /// Elapsed time passed the configured bound
    DeadlineExceeded,
}

/// Poll FSM.
///
/// Lives for a single poll invocation: it is resumed in `Started` from the
/// pending operation and driven by what that one status query observed.
#[derive(Debug, Clone)]
pub struct PollFsm {
    state: PollState,
    error: Option<String>,
}

impl PollFsm {
    /// Resume polling for a started build
    pub fn resume() -> Self {
        Self {
            state: PollState::Started,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PollEvent) -> Result<PollState, DeployerError> {
        if self.state.is_done() {
            return Err(DeployerError::InvalidTransition(format!(
                "{:?} -> {:?}",
                self.state, event
            )));
        }

        let new_state = match event {
            PollEvent::StatusObserved(status) if !status.is_terminal() => PollState::Polling,
            PollEvent::StatusObserved(BuildStatus::Succeeded) => PollState::DoneSuccess,
            PollEvent::StatusObserved(status) => {
                self.error = Some(format!("build finished with status {}", status));
                PollState::DoneFailure
            }
            PollEvent::QueryFailed(err) => {
                self.error = Some(err);
                PollState::Polling
            }
            PollEvent::QueryRejected(err) => {
                self.error = Some(err);
                PollState::DoneFailure
            }
            PollEvent::DeadlineExceeded => PollState::DoneTimeout,
        };

        self.state = new_state;
        Ok(new_state)
    }
}
