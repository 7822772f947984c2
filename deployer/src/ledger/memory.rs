//! In-memory delivery ledger

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{now_secs, Claim, DeliveryLedger, Records, RequestRecord};
use crate::errors::DeployerError;
use crate::models::operation::PendingOperation;
use crate::models::result::DeploymentResult;

/// In-memory ledger with a bounded number of entries.
///
/// Good for a long-running invocation server; a one-shot process forgets
/// everything on exit and should use [`super::FileLedger`].
pub struct MemoryLedger {
    records: Mutex<Records>,
    capacity: usize,
}

impl MemoryLedger {
    /// Create a new ledger holding at most `capacity` requests
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Records::default()),
            capacity: capacity.max(1),
        }
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of remembered requests
    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl DeliveryLedger for MemoryLedger {
    async fn get(&self, request_id: &str) -> Result<Option<RequestRecord>, DeployerError> {
        Ok(self.records().get(request_id).cloned())
    }

    async fn record_started(
        &self,
        request_id: &str,
        operation: &PendingOperation,
    ) -> Result<(), DeployerError> {
        self.records()
            .record_started(request_id, operation, now_secs(), self.capacity);
        Ok(())
    }

    async fn try_claim(
        &self,
        request_id: &str,
        result: &DeploymentResult,
    ) -> Result<Claim, DeployerError> {
        Ok(self
            .records()
            .try_claim(request_id, result, now_secs(), self.capacity))
    }

    async fn release(&self, request_id: &str) -> Result<(), DeployerError> {
        self.records().release(request_id, now_secs());
        Ok(())
    }

    async fn mark_delivered(
        &self,
        request_id: &str,
        result: &DeploymentResult,
    ) -> Result<(), DeployerError> {
        self.records()
            .mark_delivered(request_id, result, now_secs(), self.capacity);
        Ok(())
    }
}
