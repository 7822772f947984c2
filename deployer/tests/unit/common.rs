//! Shared fakes and fixtures

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cdk_deployer::build::{BuildServiceClient, StartBuildRequest};
use cdk_deployer::callback::{CallbackChannel, CallbackTarget};
use cdk_deployer::deploy::handler::{Deployer, DeployerOptions};
use cdk_deployer::errors::{BuildServiceError, DeployerError};
use cdk_deployer::ledger::MemoryLedger;
use cdk_deployer::models::request::{DeploymentRequest, RequestContext};
use cdk_deployer::models::status::{BuildReport, BuildStatus};
use chrono::{DateTime, TimeZone, Utc};
use provisioning_protocol::{
    CallbackPayload, InvocationEnvelope, Parameters, RequestType, ResourceProperties,
};

pub const RESPONSE_URL: &str = "https://callbacks.example/req-1?signature=abc";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn parameters() -> Parameters {
    [("Foo", "no-value"), ("Bar", "some-value")]
        .into_iter()
        .collect()
}

pub fn context() -> RequestContext {
    RequestContext {
        request_id: "req-1".to_string(),
        stack_id: "arn:stack/demo".to_string(),
        logical_resource_id: "Deployer".to_string(),
    }
}

pub fn request(request_type: RequestType, physical_resource_id: Option<&str>) -> DeploymentRequest {
    DeploymentRequest {
        request_type,
        build_project_id: "deploy-project".to_string(),
        parameters: parameters(),
        app_location: Some("refarch/aws-native".to_string()),
        physical_resource_id: physical_resource_id.map(str::to_string),
        context: context(),
    }
}

pub fn envelope(request_type: RequestType, physical_resource_id: Option<&str>) -> InvocationEnvelope {
    InvocationEnvelope {
        request_type,
        request_id: "req-1".to_string(),
        stack_id: "arn:stack/demo".to_string(),
        logical_resource_id: "Deployer".to_string(),
        physical_resource_id: physical_resource_id.map(str::to_string),
        response_url: Some(RESPONSE_URL.to_string()),
        resource_properties: ResourceProperties {
            build_project_id: "deploy-project".to_string(),
            parameters: parameters(),
            app_location: Some("refarch/aws-native".to_string()),
        },
        pending_operation: None,
    }
}

/// Build client answering status queries from a script.
///
/// Once the script runs out the last answer repeats.
pub struct ScriptedBuildClient {
    start_result: Result<String, BuildServiceError>,
    statuses: Mutex<VecDeque<Result<BuildReport, BuildServiceError>>>,
    last_status: Mutex<Option<Result<BuildReport, BuildServiceError>>>,
    pub start_calls: Mutex<Vec<StartBuildRequest>>,
    pub status_calls: AtomicUsize,
}

impl ScriptedBuildClient {
    pub fn new(statuses: Vec<Result<BuildReport, BuildServiceError>>) -> Self {
        Self {
            start_result: Ok("deploy-project:build-1".to_string()),
            statuses: Mutex::new(statuses.into()),
            last_status: Mutex::new(None),
            start_calls: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(statuses: &[BuildStatus]) -> Self {
        Self::new(statuses.iter().map(|s| Ok(BuildReport::new(*s))).collect())
    }

    pub fn rejecting_start(error: BuildServiceError) -> Self {
        Self {
            start_result: Err(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.lock().unwrap().len()
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildServiceClient for ScriptedBuildClient {
    async fn start_build(&self, request: &StartBuildRequest) -> Result<String, BuildServiceError> {
        self.start_calls.lock().unwrap().push(request.clone());
        self.start_result.clone()
    }

    async fn get_build_status(&self, _build_id: &str) -> Result<BuildReport, BuildServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        let mut last = self.last_status.lock().unwrap();
        match next {
            Some(answer) => {
                *last = Some(answer.clone());
                answer
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(BuildServiceError::NotFound("unscripted".to_string()))),
        }
    }
}

/// Callback channel recording what it delivered; fails the first
/// `failures` deliveries.
#[derive(Default)]
pub struct RecordingChannel {
    failures: AtomicUsize,
    delay: Option<Duration>,
    pub delivered: Mutex<Vec<(String, CallbackPayload)>>,
}

impl RecordingChannel {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    /// Every delivery takes `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<CallbackPayload> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl CallbackChannel for RecordingChannel {
    async fn deliver(
        &self,
        target: &CallbackTarget,
        payload: &CallbackPayload,
    ) -> Result<(), DeployerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DeployerError::ReportingError("connection refused".to_string()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((target.expose_url().to_string(), payload.clone()));
        Ok(())
    }
}

/// A deployer wired to fakes
pub struct Harness {
    pub build: Arc<ScriptedBuildClient>,
    pub channel: Arc<RecordingChannel>,
    pub deployer: Deployer,
}

impl Harness {
    pub fn new(build: ScriptedBuildClient, channel: RecordingChannel) -> Self {
        Self::with_options(build, channel, DeployerOptions::default())
    }

    pub fn with_options(
        build: ScriptedBuildClient,
        channel: RecordingChannel,
        options: DeployerOptions,
    ) -> Self {
        let build = Arc::new(build);
        let channel = Arc::new(channel);
        let deployer = Deployer::new(
            build.clone(),
            channel.clone(),
            Arc::new(MemoryLedger::default()),
            options,
        );
        Self {
            build,
            channel,
            deployer,
        }
    }
}
