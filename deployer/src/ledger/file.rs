//! File-backed delivery ledger

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{now_secs, Claim, DeliveryLedger, Records, RequestRecord};
use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::models::operation::PendingOperation;
use crate::models::result::DeploymentResult;

/// Ledger persisted as a JSON file, so that separate one-shot processes
/// share what was started and delivered.
///
/// The mutex serializes read-modify-write within one process; separate
/// processes rely on the engine's per-resource ordering.
pub struct FileLedger {
    file: File,
    capacity: usize,
    lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(file: File, capacity: usize) -> Self {
        Self {
            file,
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Records, DeployerError> {
        if !self.file.exists().await {
            return Ok(Records::default());
        }
        self.file.read_json().await.map_err(|e| {
            DeployerError::LedgerError(format!("{}: {}", self.file.path().display(), e))
        })
    }

    /// Load, apply `change`, write back, all under the lock
    async fn update<T, F>(&self, change: F) -> Result<T, DeployerError>
    where
        F: FnOnce(&mut Records, u64, usize) -> T + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let outcome = change(&mut records, now_secs(), self.capacity);

        debug!("Writing delivery ledger {}", self.file.path().display());
        self.file.write_json(&records).await.map_err(|e| {
            DeployerError::LedgerError(format!("{}: {}", self.file.path().display(), e))
        })?;
        Ok(outcome)
    }
}

#[async_trait]
impl DeliveryLedger for FileLedger {
    async fn get(&self, request_id: &str) -> Result<Option<RequestRecord>, DeployerError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(request_id).cloned())
    }

    async fn record_started(
        &self,
        request_id: &str,
        operation: &PendingOperation,
    ) -> Result<(), DeployerError> {
        self.update(|records, now, capacity| {
            records.record_started(request_id, operation, now, capacity)
        })
        .await
    }

    async fn try_claim(
        &self,
        request_id: &str,
        result: &DeploymentResult,
    ) -> Result<Claim, DeployerError> {
        self.update(|records, now, capacity| records.try_claim(request_id, result, now, capacity))
            .await
    }

    async fn release(&self, request_id: &str) -> Result<(), DeployerError> {
        self.update(|records, now, _| records.release(request_id, now))
            .await
    }

    async fn mark_delivered(
        &self,
        request_id: &str,
        result: &DeploymentResult,
    ) -> Result<(), DeployerError> {
        self.update(|records, now, capacity| {
            records.mark_delivered(request_id, result, now, capacity)
        })
        .await
    }
}
