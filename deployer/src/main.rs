//! cdk-deployer - Entry Point
//!
//! One-shot: `cdk-deployer --event=envelope.json` (or `--event=-` for stdin)
//! handles a single trigger or poll and prints the invocation response.
//! `--watch` keeps polling locally until the result is reported.
//! `--serve` exposes the same handling over HTTP for an external scheduler.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use anyhow::Context;
use cdk_deployer::app::options::AppOptions;
use cdk_deployer::app::run::run;
use cdk_deployer::app::state::AppState;
use cdk_deployer::filesys::file::File;
use cdk_deployer::logs::{init_logging, LogOptions};
use cdk_deployer::storage::settings::{Settings, DEFAULT_SETTINGS_PATH};
use cdk_deployer::utils::version_info;
use cdk_deployer::workers::poller;
use provisioning_protocol::InvocationEnvelope;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("settings")
        .cloned()
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = match Settings::load_or_default(&File::new(&settings_path)).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file {}: {}", settings_path, e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: settings.log_dir.clone(),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from(&settings);

    if cli_args.contains_key("serve") {
        info!("Running invocation server with options: {:?}", options);
        return match run(options, await_shutdown_signal()).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Invocation server failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(event) = cli_args.get("event") else {
        eprintln!("Usage: cdk-deployer --event=<file|-> [--watch] [--settings=<file>]");
        eprintln!("       cdk-deployer --serve [--settings=<file>]");
        eprintln!("       cdk-deployer --version");
        return ExitCode::FAILURE;
    };

    match invoke_once(&options, event, cli_args.contains_key("watch")).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Invocation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn read_envelope(source: &str) -> anyhow::Result<InvocationEnvelope> {
    let raw = if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("reading envelope from stdin")?;
        raw
    } else {
        File::new(source)
            .read_string()
            .await
            .with_context(|| format!("reading envelope from {}", source))?
    };

    serde_json::from_str(&raw).context("parsing invocation envelope")
}

async fn invoke_once(options: &AppOptions, source: &str, watch: bool) -> anyhow::Result<()> {
    let envelope = read_envelope(source).await?;
    let app_state = AppState::init_one_shot(options).context("initializing deployer")?;

    let response = if watch {
        poller::run(
            &options.poller,
            &app_state.deployer,
            envelope,
            tokio::time::sleep,
            Box::pin(await_shutdown_signal()),
        )
        .await?
    } else {
        app_state.deployer.invoke(&envelope).await?
    };

    // The scheduler persists whatever is printed here
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
