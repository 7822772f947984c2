//! Delivery ledger tests

use cdk_deployer::filesys::file::File;
use cdk_deployer::ledger::{Claim, DeliveryLedger, FileLedger, MemoryLedger, RequestRecord};
use cdk_deployer::models::operation::PendingOperation;
use cdk_deployer::models::result::DeploymentResult;
use chrono::{TimeZone, Utc};
use tokio_test::assert_ok;

fn op() -> PendingOperation {
    let started = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    PendingOperation::new("deploy-project:build-1", "Deployer-abc", started)
}

#[tokio::test]
async fn test_memory_ledger_eviction() {
    let ledger = MemoryLedger::new(2);
    let result = DeploymentResult::success("Deployer-abc");

    assert_ok!(ledger.mark_delivered("req-1", &result).await);
    assert_ok!(ledger.mark_delivered("req-2", &result).await);
    assert_ok!(ledger.mark_delivered("req-3", &result).await);

    assert_eq!(ledger.len(), 2);
    assert!(ledger.get("req-1").await.unwrap().is_none());
    assert!(ledger.get("req-3").await.unwrap().is_some());
}

#[tokio::test]
async fn test_started_build_is_remembered() {
    let ledger = MemoryLedger::default();

    assert_ok!(ledger.record_started("req-1", &op()).await);
    // A second start record for the same request keeps the first
    let mut other = op();
    other.build_id = "deploy-project:build-2".to_string();
    assert_ok!(ledger.record_started("req-1", &other).await);

    assert_eq!(
        ledger.get("req-1").await.unwrap(),
        Some(RequestRecord::Started { operation: op() })
    );
}

#[tokio::test]
async fn test_file_ledger_shared_between_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("ledger.json");
    let result = DeploymentResult::failure("Deployer-abc", "boom");

    let first = FileLedger::new(File::new(&path), 100);
    assert!(first.get("req-1").await.unwrap().is_none());
    assert_ok!(first.record_started("req-2", &op()).await);
    assert_eq!(
        assert_ok!(first.try_claim("req-1", &result).await),
        Claim::Acquired(result.clone())
    );
    assert_ok!(first.mark_delivered("req-1", &result).await);

    // A second process sees what the first one started and delivered
    let second = FileLedger::new(File::new(&path), 100);
    assert_eq!(
        second.get("req-1").await.unwrap(),
        Some(RequestRecord::Delivered { result })
    );
    assert_eq!(
        second.get("req-2").await.unwrap(),
        Some(RequestRecord::Started { operation: op() })
    );
    assert!(second.get("req-3").await.unwrap().is_none());
}
