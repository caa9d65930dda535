//! Relay forward proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                     RELAY PROXY                       │
//!                        │                                                       │
//!   GET /proxy?url=      │  ┌──────────┐   ┌──────────┐   ┌──────────────┐       │
//!   ─────────────────────┼─▶│   http   │──▶│ upstream │──▶│   rewrite    │       │
//!                        │  │  proxy   │   │  fetch   │   │ html + style │       │
//!                        │  └──────────┘   └──────────┘   └──────────────┘       │
//!                        │                                                       │
//!   /api/bookmarks       │  ┌──────────┐   ┌──────────┐   ┌──────────────┐       │
//!   WebSocket / or /ws ──┼─▶│ http api │──▶│bookmarks │──▶│   realtime   │──▶ all│
//!                        │  │   + ws   │   │  store   │   │  broadcast   │ sessions
//!                        │  └──────────┘   └──────────┘   └──────────────┘       │
//!                        │                                                       │
//!                        │  config · observability · security · lifecycle        │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use relay_proxy::config::resolve_config;
use relay_proxy::lifecycle::spawn_signal_listener;
use relay_proxy::observability::{logging, metrics};
use relay_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "relay-proxy")]
#[command(about = "Forward proxy with page rewriting and live bookmarks", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let port = std::env::var("PORT").ok();
    let config = resolve_config(args.config.as_deref(), port.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("relay-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.upstream.timeout_secs,
        static_root = %config.static_files.root,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
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
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, shutdown)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
