//! Invocation server run loop

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::app::state::AppState;
use crate::errors::DeployerError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the invocation server until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeployerError> {
    info!("Initializing cdk-deployer...");

    let app_state = AppState::init(&options)?;
    let server_state = Arc::new(ServerState::new(app_state.deployer.clone()));

    let handle = serve(&options.server, server_state, shutdown_signal).await?;

    match handle.await {
        Ok(result) => {
            info!("Server stopped");
            result
        }
        Err(e) => {
            error!("Server task failed: {}", e);
            Err(DeployerError::ShutdownError(e.to_string()))
        }
    }
}
