//! # HAL Manager Binary
//!
//! Provisions internal HALs from `hal-*.json` descriptors, then serves the
//! manager verbs over stdin/stdout, one JSON request per line:
//!
//! ```text
//! {"verb": "loaded", "args": {"verbose": true}}
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Default config (/etc/hal_manager/manager.toml)
//! hal_manager
//!
//! # Explicit descriptor directories
//! hal_manager --config-dir /etc/hal_manager/config.d:/opt/board/hal
//!
//! # Verbose JSON logs
//! hal_manager -v --json
//! ```

use clap::Parser;
use hal_common::config::HalManagerConfig;
use hal_manager::handlers::RequestError;
use hal_manager::{channel, HalManager, LocalHost, ManagerHandle, Response};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Handle used to apply the configured log level once the config is loaded.
type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// HAL Manager - audio HAL registry and provisioning
#[derive(Parser, Debug)]
#[command(name = "hal_manager")]
#[command(version)]
#[command(about = "Registry and provisioning of audio HAL endpoints")]
#[command(long_about = None)]
struct Args {
    /// Path to the manager configuration file. Defaults apply when missing.
    #[arg(short, long, default_value = hal_common::consts::DEFAULT_MANAGER_CONFIG)]
    config: PathBuf,

    /// Descriptor directories (`:`-separated). Overrides CONTROL_CONFIG_PATH
    /// and the configured path.
    #[arg(long, value_name = "DIRS")]
    config_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// One request line read from stdin.
#[derive(Debug, Deserialize)]
struct RequestLine {
    verb: String,
    #[serde(default)]
    args: Value,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run().await {
        error!("HAL manager failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing first: config loading logs through it
    let log_filter = setup_tracing(&args);

    info!("HAL Manager v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = HalManagerConfig::load_or_default(&args.config)?;
    if !args.verbose {
        log_filter.reload(level_filter(config.shared.log_level.into()))?;
    }

    let (handle, rx) = channel();
    let host = LocalHost::new(&handle);
    let mut manager = HalManager::with_defaults(&config.manager, Box::new(host));

    let descriptor_path = config.descriptor_path(args.config_dir.as_deref());
    let report = manager.provision_all(&descriptor_path);
    if !report.is_success() {
        warn!("{} descriptor(s) could not be provisioned", report.failed);
    }

    let task = tokio::spawn(manager.run(rx));

    tokio::select! {
        result = serve_stdin(&handle) => {
            match result {
                Ok(()) => info!("Input closed"),
                Err(e) => error!("Request loop error: {}", e),
            }
        }
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
                Err(e) => error!("Unable to listen for shutdown signal: {}", e),
            }
        }
    }

    if handle.shutdown().is_err() {
        warn!("HAL manager task already stopped");
    }
    let released = task.await?;

    info!("HAL Manager shutdown complete ({} HAL(s) released)", released);
    Ok(())
}

/// Forward stdin requests to the manager and print each response.
async fn serve_stdin(handle: &ManagerHandle) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RequestLine>(&line) {
            Ok(request) => handle.request(&request.verb, request.args).await?,
            Err(e) => Response::failure(&RequestError::RequestJson(e.to_string())),
        };
        println!("{}", serde_json::to_string(&response)?);
    }

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
///
/// Logs go to stderr: stdout only carries responses.
fn setup_tracing(args: &Args) -> LogFilterHandle {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let (filter, handle) = reload::Layer::new(level_filter(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if args.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    handle
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::from_default_env().add_directive(level.into())
}
