//! Deployment parameter serialization
//!
//! Parameters reach the build as one environment value of repeated
//! ` -c key=value` tokens. The build shell splits that value on whitespace
//! without any quote handling, so there is no escaping that survives it:
//! anything that would break a token is rejected instead.

use provisioning_protocol::{Parameter, Parameters};

use crate::errors::DeployerError;

fn breaks_token(c: char) -> bool {
    c.is_whitespace() || c.is_control()
}

/// Check that a parameter renders to exactly one `key=value` token
pub fn validate_parameter(parameter: &Parameter) -> Result<(), DeployerError> {
    let key = &parameter.key;
    if key.is_empty() {
        return Err(DeployerError::ValidationError(
            "parameter key must not be empty".to_string(),
        ));
    }
    if key.chars().any(|c| breaks_token(c) || c == '=') {
        return Err(DeployerError::ValidationError(format!(
            "parameter key {:?} must not contain whitespace, control characters or '='",
            key
        )));
    }
    if parameter.value.chars().any(breaks_token) {
        return Err(DeployerError::ValidationError(format!(
            "value of parameter {} must not contain whitespace or control characters",
            key
        )));
    }
    Ok(())
}

/// Render parameters as ` -c key=value` tokens, in input order
pub fn serialize_parameters(parameters: &Parameters) -> Result<String, DeployerError> {
    let mut rendered = String::new();
    for parameter in parameters.iter() {
        validate_parameter(parameter)?;
        rendered.push_str(" -c ");
        rendered.push_str(&parameter.key);
        rendered.push('=');
        rendered.push_str(&parameter.value);
    }
    Ok(rendered)
}
