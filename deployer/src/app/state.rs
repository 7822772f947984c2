//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::build::http::HttpBuildClient;
use crate::build::BuildServiceClient;
use crate::callback::http::HttpCallbackChannel;
use crate::callback::CallbackChannel;
use crate::deploy::handler::Deployer;
use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::ledger::{DeliveryLedger, FileLedger, MemoryLedger};

/// Main application state
pub struct AppState {
    pub deployer: Arc<Deployer>,
}

impl AppState {
    /// Wire the production clients for a single invocation.
    ///
    /// A one-shot process exits between trigger and poll, so it needs the
    /// file ledger to recognize redelivered requests.
    pub fn init_one_shot(options: &AppOptions) -> Result<Self, DeployerError> {
        if options.ledger.path.is_none() {
            return Err(DeployerError::ConfigError(
                "one-shot invocations need a ledger_path; an in-memory ledger is lost on exit"
                    .to_string(),
            ));
        }
        Self::init(options)
    }

    /// Wire the production clients into a deployer
    pub fn init(options: &AppOptions) -> Result<Self, DeployerError> {
        let build_client: Arc<dyn BuildServiceClient> = Arc::new(HttpBuildClient::new(
            &options.build_service_url,
            options.build_service_timeout,
        )?);

        let channel: Arc<dyn CallbackChannel> =
            Arc::new(HttpCallbackChannel::new(options.callback_timeout)?);

        let ledger: Arc<dyn DeliveryLedger> = match &options.ledger.path {
            Some(path) => {
                info!("Using delivery ledger file {}", path.display());
                Arc::new(FileLedger::new(File::new(path), options.ledger.capacity))
            }
            None => Arc::new(MemoryLedger::new(options.ledger.capacity)),
        };

        let deployer = Deployer::new(build_client, channel, ledger, options.deployer.clone());

        Ok(Self {
            deployer: Arc::new(deployer),
        })
    }
}
