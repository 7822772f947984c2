//! Settings file management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/cdk-deployer/settings.json";

/// Default location of the delivery ledger
pub const DEFAULT_LEDGER_PATH: &str = "/var/lib/cdk-deployer/ledger.json";

/// Deployer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Build service configuration
    #[serde(default)]
    pub build_service: BuildServiceSettings,

    /// Callback channel configuration
    #[serde(default)]
    pub callback: CallbackSettings,

    /// Polling configuration
    #[serde(default)]
    pub poll: PollSettings,

    /// Delivery ledger file. An explicit `null` selects an in-memory
    /// ledger, which one-shot invocations refuse.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: Option<PathBuf>,

    /// Invocation server configuration
    #[serde(default)]
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            build_service: BuildServiceSettings::default(),
            callback: CallbackSettings::default(),
            poll: PollSettings::default(),
            ledger_path: default_ledger_path(),
            server: ServerSettings::default(),
        }
    }
}

fn default_ledger_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_LEDGER_PATH))
}

impl Settings {
    /// Load settings from `file`, falling back to defaults when it does not exist
    pub async fn load_or_default(file: &File) -> Result<Settings, DeployerError> {
        if !file.exists().await {
            return Ok(Settings::default());
        }
        file.read_json::<Settings>().await
    }
}

/// Build service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildServiceSettings {
    /// Base URL of the build gateway
    #[serde(default = "default_build_service_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_build_service_url() -> String {
    "http://localhost:8700/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BuildServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_build_service_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Callback channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackSettings {
    /// Endpoint used when an envelope carries no ResponseURL
    #[serde(default)]
    pub default_endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Maximum length of the Reason field, in characters
    #[serde(default = "default_max_reason_len")]
    pub max_reason_len: usize,
}

fn default_max_reason_len() -> usize {
    1024
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            default_endpoint: None,
            timeout_secs: default_request_timeout(),
            max_reason_len: default_max_reason_len(),
        }
    }
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Interval between polls when the deployer drives its own schedule
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,

    /// Upper bound on the time a build may take before it is reported as timed out
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Number of trailing build log lines kept in failure messages
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,
}

fn default_poll_interval() -> u64 {
    30
}

fn default_max_wait() -> u64 {
    3600
}

fn default_log_tail_lines() -> usize {
    20
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            log_tail_lines: default_log_tail_lines(),
        }
    }
}

/// Invocation server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}
