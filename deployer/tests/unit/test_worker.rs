//! Polling worker tests

use std::future::{self, Future};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdk_deployer::errors::{BuildServiceError, DeployerError};
use cdk_deployer::models::result::{Delivery, InvocationResponse};
use cdk_deployer::models::status::BuildStatus;
use cdk_deployer::workers::poller::{run, Options};
use provisioning_protocol::{CallbackStatus, RequestType};
use tokio_test::{assert_err, assert_ok};

use crate::common::{envelope, Harness, RecordingChannel, ScriptedBuildClient};

fn options() -> Options {
    Options {
        interval: Duration::from_secs(30),
        max_redeliveries: 2,
    }
}

fn never() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(future::pending())
}

#[tokio::test]
async fn test_drives_build_to_completion() {
    let harness = Harness::new(
        ScriptedBuildClient::with_statuses(&[
            BuildStatus::InProgress,
            BuildStatus::InProgress,
            BuildStatus::Succeeded,
        ]),
        RecordingChannel::default(),
    );
    let sleeps = Arc::new(AtomicUsize::new(0));
    let counter = sleeps.clone();

    let response = assert_ok!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Create, None),
            move |interval| {
                assert_eq!(interval, Duration::from_secs(30));
                counter.fetch_add(1, Ordering::SeqCst);
                future::ready(())
            },
            never(),
        )
        .await
    );

    assert!(matches!(
        response,
        InvocationResponse::Complete {
            delivery: Delivery::Delivered,
            ..
        }
    ));
    assert_eq!(sleeps.load(Ordering::SeqCst), 3);
    assert_eq!(harness.build.start_count(), 1);
    assert_eq!(harness.build.status_count(), 3);
    assert_eq!(harness.channel.payloads()[0].status, CallbackStatus::Success);
}

#[tokio::test]
async fn test_delete_needs_no_polling() {
    let harness = Harness::new(ScriptedBuildClient::new(Vec::new()), RecordingChannel::default());

    let response = assert_ok!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Delete, Some("Deployer-abc")),
            |_: Duration| -> future::Ready<()> { panic!("no sleep expected") },
            never(),
        )
        .await
    );

    assert!(response.is_complete());
    assert_eq!(harness.build.status_count(), 0);
}

#[tokio::test]
async fn test_redelivers_after_callback_failure() {
    let harness = Harness::new(
        ScriptedBuildClient::with_statuses(&[BuildStatus::Succeeded]),
        RecordingChannel::failing(2),
    );

    let response = assert_ok!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Create, None),
            |_| future::ready(()),
            never(),
        )
        .await
    );

    assert!(response.is_complete());
    assert_eq!(harness.channel.payloads().len(), 1);
    assert_eq!(harness.build.start_count(), 1);
}

#[tokio::test]
async fn test_gives_up_after_max_redeliveries() {
    let harness = Harness::new(
        ScriptedBuildClient::with_statuses(&[BuildStatus::Succeeded]),
        RecordingChannel::failing(10),
    );

    let err = assert_err!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Create, None),
            |_| future::ready(()),
            never(),
        )
        .await
    );

    assert!(matches!(err, DeployerError::ReportingError(_)));
    assert!(harness.channel.payloads().is_empty());
}

#[tokio::test]
async fn test_shutdown_returns_pending_response() {
    let harness = Harness::new(
        ScriptedBuildClient::with_statuses(&[BuildStatus::InProgress]),
        RecordingChannel::default(),
    );

    let response = assert_ok!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Create, None),
            |_| future::pending::<()>(),
            Box::pin(future::ready(())),
        )
        .await
    );

    assert!(matches!(response, InvocationResponse::Pending { .. }));
    assert_eq!(harness.build.status_count(), 0);
    assert!(harness.channel.payloads().is_empty());
}

#[tokio::test]
async fn test_first_invocation_redelivered_after_callback_failure() {
    let harness = Harness::new(ScriptedBuildClient::new(Vec::new()), RecordingChannel::failing(1));
    let sleeps = Arc::new(AtomicUsize::new(0));
    let counter = sleeps.clone();

    let response = assert_ok!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Delete, Some("Deployer-abc")),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                future::ready(())
            },
            never(),
        )
        .await
    );

    assert!(response.is_complete());
    assert_eq!(sleeps.load(Ordering::SeqCst), 1);
    assert_eq!(harness.channel.payloads().len(), 1);
}

#[tokio::test]
async fn test_rejected_start_reported_once_without_restart() {
    let harness = Harness::new(
        ScriptedBuildClient::rejecting_start(BuildServiceError::Throttled("slow down".into())),
        RecordingChannel::failing(1),
    );

    let response = assert_ok!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Create, None),
            |_| future::ready(()),
            never(),
        )
        .await
    );

    assert!(response.is_complete());
    assert_eq!(harness.build.start_count(), 1);
    let payloads = harness.channel.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].status, CallbackStatus::Failed);
}

#[tokio::test]
async fn test_shutdown_before_any_response() {
    let harness = Harness::new(ScriptedBuildClient::new(Vec::new()), RecordingChannel::failing(10));

    let err = assert_err!(
        run(
            &options(),
            &harness.deployer,
            envelope(RequestType::Delete, Some("Deployer-abc")),
            |_| future::pending::<()>(),
            Box::pin(future::ready(())),
        )
        .await
    );

    assert!(matches!(err, DeployerError::ShutdownError(_)));
}
