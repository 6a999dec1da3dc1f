//! swissknife bridge - MCP over stdio, tools over HTTP
//!
//! Speaks `Content-Length` framed JSON-RPC 2.0 on stdin/stdout and forwards
//! every tool call to the backend control server. Logs go to a file because
//! stdout is the transport.

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::info;

use swissknife_protocol::{PROTOCOL_VERSION, SERVER_NAME};
use swissknife_utils::{init_logging_with_config, KnifeError, LogConfig, Result};

mod backend;
mod bridge;
mod catalog;
mod config;
mod error;
mod proxy;

use bridge::McpBridge;
use catalog::ToolCatalog;
use config::{BridgeConfig, DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_TOOLS_TTL_SECS};
use proxy::HttpProxy;

/// MCP stdio bridge for ai-agents-swiss-knife
#[derive(Parser, Debug)]
#[command(name = "swissknife-bridge")]
#[command(version)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "MCP_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Seconds a fetched tool catalog stays fresh
    #[arg(long, env = "MCP_TOOLS_CACHE_TTL_S", default_value_t = DEFAULT_TOOLS_TTL_SECS)]
    tools_ttl: u64,

    /// Per-call backend timeout in seconds
    #[arg(long, env = "MCP_HTTP_TIMEOUT_S", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    http_timeout: u64,

    /// Print validated bridge connection settings as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match BridgeConfig::new(&cli.base_url, cli.tools_ttl, cli.http_timeout) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let result = if cli.print_config {
        print_config(&config).await
    } else {
        run_bridge(config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("swissknife-bridge: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_bridge(config: BridgeConfig) -> Result<()> {
    init_logging_with_config(LogConfig::bridge())?;
    info!(base_url = %config.base_url, ttl = ?config.tools_ttl, "Starting bridge");

    let proxy = HttpProxy::new(config.base_url.clone(), config.http_timeout)
        .map_err(|e| KnifeError::internal(e.to_string()))?;
    let mut bridge = McpBridge::new(proxy, ToolCatalog::new(config.tools_ttl));

    bridge
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await
        .map_err(|e| KnifeError::internal(e.to_string()))
}

async fn print_config(config: &BridgeConfig) -> Result<()> {
    let proxy = HttpProxy::new(config.base_url.clone(), config.http_timeout)
        .map_err(|e| KnifeError::internal(e.to_string()))?;
    let health = match proxy.request("GET", swissknife_protocol::HEALTH_PATH, None).await {
        Ok(value) => value,
        Err(e) => e.to_payload(),
    };

    let report = json!({
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": PROTOCOL_VERSION,
        "baseUrl": proxy.base_url(),
        "healthUrl": config.health_url(),
        "toolsUrl": config.tools_url(),
        "health": health,
        "bridgeCommand": {
            "command": env!("CARGO_PKG_NAME"),
            "env": {"MCP_BASE_URL": proxy.base_url()},
        },
    });

    let pretty = serde_json::to_string_pretty(&report).map_err(|e| KnifeError::internal(e.to_string()))?;
    println!("{}", pretty);
    Ok(())
}
