//! Trigger handler tests

use std::sync::Arc;

use cdk_deployer::build::{APP_LOCATION_VAR, PARAMETERS_VAR, STACK_NAME_VAR};
use cdk_deployer::deploy::trigger::{TriggerHandler, TriggerOutcome};
use cdk_deployer::errors::BuildServiceError;
use cdk_deployer::models::operation::PENDING_OPERATION_VERSION;
use provisioning_protocol::{Parameter, RequestType};

use crate::common::{request, t0, ScriptedBuildClient};

fn handler(client: &Arc<ScriptedBuildClient>) -> TriggerHandler {
    TriggerHandler::new(client.clone())
}

#[tokio::test]
async fn test_create_starts_exactly_one_build() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));

    let outcome = handler(&client)
        .handle_at(&request(RequestType::Create, None), t0())
        .await;

    let TriggerOutcome::Pending(op) = outcome else {
        panic!("expected a pending operation");
    };
    assert_eq!(op.build_id, "deploy-project:build-1");
    assert_eq!(op.started_at, t0());
    assert_eq!(op.version(), PENDING_OPERATION_VERSION);
    assert!(op.physical_resource_id.starts_with("Deployer-"));
    assert_eq!(client.start_count(), 1);
    assert_eq!(client.status_count(), 0);
}

#[tokio::test]
async fn test_create_generates_fresh_physical_ids() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));
    let handler = handler(&client);

    let first = handler.handle_at(&request(RequestType::Create, None), t0()).await;
    let second = handler.handle_at(&request(RequestType::Create, None), t0()).await;

    match (first, second) {
        (TriggerOutcome::Pending(a), TriggerOutcome::Pending(b)) => {
            assert_ne!(a.physical_resource_id, b.physical_resource_id);
        }
        other => panic!("expected two pending operations, got {other:?}"),
    }
}

#[tokio::test]
async fn test_build_environment() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));

    handler(&client)
        .handle_at(&request(RequestType::Create, None), t0())
        .await;

    let calls = client.start_calls.lock().unwrap();
    let call = &calls[0];
    assert_eq!(call.project_id, "deploy-project");
    assert_eq!(call.parameter_string, " -c Foo=no-value -c Bar=some-value");

    let env: Vec<(&str, &str)> = call
        .environment
        .iter()
        .map(|v| (v.name.as_str(), v.value.as_str()))
        .collect();
    assert_eq!(
        env,
        vec![
            (PARAMETERS_VAR, " -c Foo=no-value -c Bar=some-value"),
            (STACK_NAME_VAR, ""),
            (APP_LOCATION_VAR, "refarch/aws-native"),
        ]
    );
}

#[tokio::test]
async fn test_update_keeps_physical_id() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));

    let outcome = handler(&client)
        .handle_at(&request(RequestType::Update, Some("Deployer-abc")), t0())
        .await;

    match outcome {
        TriggerOutcome::Pending(op) => assert_eq!(op.physical_resource_id, "Deployer-abc"),
        other => panic!("expected a pending operation, got {other:?}"),
    }
    assert_eq!(client.start_count(), 1);
}

#[tokio::test]
async fn test_update_without_physical_id_fails() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));

    let outcome = handler(&client)
        .handle_at(&request(RequestType::Update, None), t0())
        .await;

    match outcome {
        TriggerOutcome::Done(result) => {
            assert!(!result.is_success());
            assert!(result.error_message.unwrap().contains("physical resource id"));
        }
        other => panic!("expected a failure, got {other:?}"),
    }
    assert_eq!(client.start_count(), 0);
}

#[tokio::test]
async fn test_delete_never_starts_a_build() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));

    let outcome = handler(&client)
        .handle_at(&request(RequestType::Delete, Some("Deployer-abc")), t0())
        .await;

    match outcome {
        TriggerOutcome::Done(result) => {
            assert!(result.is_success());
            assert_eq!(result.physical_resource_id, "Deployer-abc");
        }
        other => panic!("expected an immediate success, got {other:?}"),
    }
    assert_eq!(client.start_count(), 0);
}

#[tokio::test]
async fn test_start_rejection_is_a_failure() {
    let client = Arc::new(ScriptedBuildClient::rejecting_start(
        BuildServiceError::Rejected("project not found".to_string()),
    ));

    let outcome = handler(&client)
        .handle_at(&request(RequestType::Update, Some("Deployer-abc")), t0())
        .await;

    match outcome {
        TriggerOutcome::Done(result) => {
            assert!(!result.is_success());
            assert_eq!(result.physical_resource_id, "Deployer-abc");
            let message = result.error_message.unwrap();
            assert!(message.contains("deploy-project"));
            assert!(message.contains("project not found"));
        }
        other => panic!("expected a failure, got {other:?}"),
    }
    // Not retried
    assert_eq!(client.start_count(), 1);
}

#[tokio::test]
async fn test_unrenderable_parameter_fails_without_starting() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));
    let mut request = request(RequestType::Create, None);
    request
        .parameters
        .0
        .push(Parameter::new("Broken", "two words"));

    let outcome = handler(&client).handle_at(&request, t0()).await;

    assert!(matches!(outcome, TriggerOutcome::Done(ref r) if !r.is_success()));
    assert_eq!(client.start_count(), 0);
}

#[tokio::test]
async fn test_empty_project_fails_without_starting() {
    let client = Arc::new(ScriptedBuildClient::new(Vec::new()));
    let mut request = request(RequestType::Create, None);
    request.build_project_id = String::new();

    let outcome = handler(&client).handle_at(&request, t0()).await;

    assert!(matches!(outcome, TriggerOutcome::Done(ref r) if !r.is_success()));
    assert_eq!(client.start_count(), 0);
}
