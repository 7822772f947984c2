//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::fsm::FsmSettings;
use crate::deploy::handler::DeployerOptions;
use crate::storage::settings::Settings;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Build service base URL
    pub build_service_url: String,

    /// Build service request timeout
    pub build_service_timeout: Duration,

    /// Callback request timeout
    pub callback_timeout: Duration,

    /// Deployer behaviour
    pub deployer: DeployerOptions,

    /// Delivery ledger configuration
    pub ledger: LedgerOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Poller worker options, used by `--watch`
    pub poller: poller::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        AppOptions::from(&Settings::default())
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            build_service_url: settings.build_service.base_url.clone(),
            build_service_timeout: Duration::from_secs(settings.build_service.timeout_secs),
            callback_timeout: Duration::from_secs(settings.callback.timeout_secs),
            deployer: DeployerOptions {
                fsm_settings: FsmSettings {
                    max_wait: Duration::from_secs(settings.poll.max_wait_secs),
                    log_tail_lines: settings.poll.log_tail_lines,
                },
                max_reason_len: settings.callback.max_reason_len,
                default_callback_endpoint: settings.callback.default_endpoint.clone(),
            },
            ledger: LedgerOptions {
                path: settings.ledger_path.clone(),
                ..Default::default()
            },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            poller: poller::Options {
                interval: Duration::from_secs(settings.poll.interval_secs),
                ..Default::default()
            },
        }
    }
}

/// Delivery ledger options
#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Ledger file; in-memory ledger when `None`, which only the server accepts
    pub path: Option<PathBuf>,

    /// Maximum remembered request ids
    pub capacity: usize,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            path: None,
            capacity: 10_000,
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
