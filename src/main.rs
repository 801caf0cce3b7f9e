//! Edge proxy binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     EDGE PROXY                        │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌─────────┐           │
//!   ─────────────────┼─▶│ security │──▶│ preflight│──▶│ routing │           │
//!                    │  │ UA/Origin│   │  (204)   │   │ /keys   │           │
//!                    │  └────┬─────┘   └──────────┘   │ /wg     │           │
//!                    │       │ 403                    └────┬────┘           │
//!                    │       ▼                             │ 404            │
//!                    │                                     ▼                │
//!   Client Response  │  ┌──────────┐              ┌──────────────┐          │
//!   ◀────────────────┼──│ response │◀─────────────│   upstream   │◀─────────┼── Key / VPN
//!                    │  │ CORS/cache│    500 on   │ reqwest call │          │   APIs
//!                    │  └──────────┘  transport   └──────────────┘          │
//!                    │                 failure                              │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_proxy::config::{load_config, ProxyConfig};
use edge_proxy::observability::{logging, metrics};
use edge_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-proxy")]
#[command(about = "Edge proxy for the key generation and VPN registration APIs", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);

    tracing::info!("edge-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config)?;

    tokio::spawn(async move {
        shutdown.trigger_on_ctrl_c().await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
