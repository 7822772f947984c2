//! Deployment request models

use provisioning_protocol::{InvocationEnvelope, Parameters, RequestType};

/// Identity of the engine request a result belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub stack_id: String,
    pub logical_resource_id: String,
}

/// A lifecycle event as seen by the trigger handler.
///
/// Owned by the invocation that received it and never retained.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub request_type: RequestType,

    /// Build project to start
    pub build_project_id: String,

    /// Named parameters in template order
    pub parameters: Parameters,

    /// Application entry point inside the source, forwarded to the build
    pub app_location: Option<String>,

    /// Set by the engine on Update and Delete
    pub physical_resource_id: Option<String>,

    pub context: RequestContext,
}

impl From<&InvocationEnvelope> for RequestContext {
    fn from(envelope: &InvocationEnvelope) -> Self {
        Self {
            request_id: envelope.request_id.clone(),
            stack_id: envelope.stack_id.clone(),
            logical_resource_id: envelope.logical_resource_id.clone(),
        }
    }
}

impl From<&InvocationEnvelope> for DeploymentRequest {
    fn from(envelope: &InvocationEnvelope) -> Self {
        let properties = &envelope.resource_properties;
        Self {
            request_type: envelope.request_type,
            build_project_id: properties.build_project_id.clone(),
            parameters: properties.parameters.clone(),
            app_location: properties.app_location.clone(),
            physical_resource_id: envelope
                .physical_resource_id
                .clone()
                .filter(|id| !id.is_empty()),
            context: RequestContext::from(envelope),
        }
    }
}
