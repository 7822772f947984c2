//! Delivery ledger
//!
//! Remembers, per engine request, whether a build was started and which
//! terminal result belongs to it, and whether that result reached the
//! engine. A redelivered trigger or a retried report is answered from here
//! instead of starting a second build or sending a second callback.

mod file;
mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;
use crate::models::operation::PendingOperation;
use crate::models::result::DeploymentResult;

/// How long a claim blocks other senders. A sender that crashed mid-delivery
/// loses its claim after this.
pub const CLAIM_LEASE_SECS: u64 = 120;

/// What the ledger knows about one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "State", rename_all = "PascalCase", rename_all_fields = "PascalCase")]
pub enum RequestRecord {
    /// The trigger started a build
    Started { operation: PendingOperation },

    /// A terminal result is stored but not yet delivered
    Reporting {
        result: DeploymentResult,
        /// Set while a sender holds the claim
        #[serde(default)]
        claimed_at: Option<u64>,
    },

    /// The terminal result was delivered
    Delivered { result: DeploymentResult },
}

/// Answer to a delivery claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller must deliver this result, the stored one if any
    Acquired(DeploymentResult),

    /// Another sender holds a live claim
    InFlight,

    /// Already delivered
    Delivered(DeploymentResult),
}

/// Record of requests, keyed by engine request id
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    /// Current record for `request_id`
    async fn get(&self, request_id: &str) -> Result<Option<RequestRecord>, DeployerError>;

    /// Remember the build started for `request_id`; no-op if a record exists
    async fn record_started(
        &self,
        request_id: &str,
        operation: &PendingOperation,
    ) -> Result<(), DeployerError>;

    /// Atomically store `result` (unless a result is already stored) and
    /// claim its delivery
    async fn try_claim(
        &self,
        request_id: &str,
        result: &DeploymentResult,
    ) -> Result<Claim, DeployerError>;

    /// Give up a claim after a failed delivery; the stored result stays
    async fn release(&self, request_id: &str) -> Result<(), DeployerError>;

    /// Mark the result of `request_id` as delivered
    async fn mark_delivered(
        &self,
        request_id: &str,
        result: &DeploymentResult,
    ) -> Result<(), DeployerError>;
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    request_id: String,
    updated_at: u64,
    record: RequestRecord,
}

/// Bounded request records, oldest first. Shared by both ledgers; callers
/// provide the locking.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Records {
    #[serde(default)]
    requests: VecDeque<Entry>,
}

impl Records {
    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    fn position(&self, request_id: &str) -> Option<usize> {
        self.requests
            .iter()
            .position(|entry| entry.request_id == request_id)
    }

    pub(crate) fn get(&self, request_id: &str) -> Option<&RequestRecord> {
        self.position(request_id).map(|i| &self.requests[i].record)
    }

    fn put(&mut self, request_id: &str, record: RequestRecord, now: u64, capacity: usize) {
        if let Some(i) = self.position(request_id) {
            let entry = &mut self.requests[i];
            entry.record = record;
            entry.updated_at = now;
            return;
        }

        while self.requests.len() >= capacity.max(1) {
            self.requests.pop_front();
        }
        self.requests.push_back(Entry {
            request_id: request_id.to_string(),
            updated_at: now,
            record,
        });
    }

    pub(crate) fn record_started(
        &mut self,
        request_id: &str,
        operation: &PendingOperation,
        now: u64,
        capacity: usize,
    ) {
        if self.position(request_id).is_none() {
            let record = RequestRecord::Started {
                operation: operation.clone(),
            };
            self.put(request_id, record, now, capacity);
        }
    }

    pub(crate) fn try_claim(
        &mut self,
        request_id: &str,
        result: &DeploymentResult,
        now: u64,
        capacity: usize,
    ) -> Claim {
        let stored = match self.get(request_id) {
            Some(RequestRecord::Delivered { result }) => return Claim::Delivered(result.clone()),
            Some(RequestRecord::Reporting {
                claimed_at: Some(at),
                ..
            }) if now.saturating_sub(*at) < CLAIM_LEASE_SECS => return Claim::InFlight,
            // First stored result wins; replays re-send it unchanged
            Some(RequestRecord::Reporting { result, .. }) => result.clone(),
            Some(RequestRecord::Started { .. }) | None => result.clone(),
        };

        let record = RequestRecord::Reporting {
            result: stored.clone(),
            claimed_at: Some(now),
        };
        self.put(request_id, record, now, capacity);
        Claim::Acquired(stored)
    }

    pub(crate) fn release(&mut self, request_id: &str, now: u64) {
        if let Some(i) = self.position(request_id) {
            let entry = &mut self.requests[i];
            if let RequestRecord::Reporting { claimed_at, .. } = &mut entry.record {
                *claimed_at = None;
                entry.updated_at = now;
            }
        }
    }

    pub(crate) fn mark_delivered(
        &mut self,
        request_id: &str,
        result: &DeploymentResult,
        now: u64,
        capacity: usize,
    ) {
        let record = RequestRecord::Delivered {
            result: result.clone(),
        };
        self.put(request_id, record, now, capacity);
    }
}
