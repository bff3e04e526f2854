//! HTTP relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::Listener ──▶ proxy::server ──▶ proxy::handler
//!                                                      │
//!                        CONNECT host:port ◀───────────┤───────────▶ other methods
//!                               │                                       │
//!                               ▼                                       ▼
//!                  tunnel::Tunnel (blind relay)          stream copy of request/response
//!                               │                                       │
//!                               └──────────────▶ Origin ◀───────────────┘
//!
//!     Cross-cutting: config, observability (tracing + metrics), lifecycle (signals, drain)
//! ```

use std::path::PathBuf;

use clap::Parser;

use http_relay::config::{load_config, RelayConfig};
use http_relay::lifecycle::wait_for_signal;
use http_relay::net::Listener;
use http_relay::observability::{logging, metrics};
use http_relay::RelayServer;

#[derive(Parser)]
#[command(name = "http-relay")]
#[command(about = "HTTP/1.1 forwarding relay with CONNECT tunnelling", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("http-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        buffer_limit = config.stream.buffer_limit,
        connect_timeout_secs = config.timeouts.connect_secs,
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

    let listener = Listener::bind(&config.listener).await?;
    let server = RelayServer::new(config);
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "Shutdown requested");
        shutdown.trigger();
    });

    server.run(listener).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
