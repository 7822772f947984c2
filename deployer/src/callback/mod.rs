//! Provisioning engine callback channel

pub mod http;

use std::fmt;

use async_trait::async_trait;
use provisioning_protocol::CallbackPayload;
use secrecy::{ExposeSecret, SecretString};

use crate::errors::DeployerError;

/// Where a callback is sent.
///
/// Response URLs are presigned and grant write access, so they are kept
/// out of logs and debug output.
#[derive(Clone)]
pub struct CallbackTarget {
    url: SecretString,
}

impl CallbackTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: SecretString::from(url.into()),
        }
    }

    pub fn expose_url(&self) -> &str {
        self.url.expose_secret()
    }
}

impl fmt::Debug for CallbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackTarget")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

/// Channel delivering terminal results to the provisioning engine
#[async_trait]
pub trait CallbackChannel: Send + Sync {
    /// Send one callback. Errors mean the engine did not receive it.
    async fn deliver(
        &self,
        target: &CallbackTarget,
        payload: &CallbackPayload,
    ) -> Result<(), DeployerError>;
}
