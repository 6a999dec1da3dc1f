//! swissknife server - backend HTTP control server
//!
//! Hosts the process controller and the one-shot shell tool behind a small
//! JSON-over-HTTP API that the stdio bridge proxies to.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

use swissknife_utils::{init_logging_with_config, KnifeError, LogConfig, Result};

mod config;
mod guard;
mod http;
mod process;
mod shell;

use config::{AppConfig, ConfigLoader};
use http::AppState;
use process::ProcessController;

/// Backend control server for swissknife tools
#[derive(Parser, Debug)]
#[command(name = "swissknife-server")]
#[command(version)]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/swissknife/config.toml)
    #[arg(long, env = "SWISSKNIFE_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address; overrides MCP_HOST and the config file
    #[arg(long)]
    host: Option<String>,

    /// Bind port; overrides MCP_PORT and the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(LogConfig::server())?;

    let config = load_config(&cli)?;
    run_server(config).await
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    ConfigLoader::apply_env(&mut config)?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let base = match &config.server.allowed_base {
        Some(base) => base.clone(),
        None => std::env::current_dir()?,
    };
    let base = base.canonicalize().map_err(|e| {
        KnifeError::config(format!("allowed base {} is not usable: {}", base.display(), e))
    })?;

    let controller = ProcessController::new(
        base,
        config.process.kill_timeout(),
        config.process.max_read_bytes,
    );
    info!(
        base = %controller.base().display(),
        capture_dir = %controller.capture_dir().display(),
        "Process controller ready"
    );

    let state = Arc::new(AppState::new(controller));
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!("Failed to bind control server to {}: {}", addr, e);
        KnifeError::Io(e)
    })?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = tokio::spawn(http::serve(listener, state, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");
    let _ = shutdown_tx.send(());

    server
        .await
        .map_err(|e| KnifeError::internal(format!("control server task failed: {}", e)))
}
