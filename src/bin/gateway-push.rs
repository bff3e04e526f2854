//! Pushes one JSON record to a data gateway.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use http_relay::config::{load_config, RelayConfig};
use http_relay::gateway::{push_with_retry, GatewayClient, PushOutcome};
use http_relay::net::Address;
use http_relay::observability::logging;

#[derive(Parser)]
#[command(name = "gateway-push")]
#[command(about = "Push a JSON record to a data gateway", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gateway address, host[:port]; overrides gateway.address
    #[arg(short, long)]
    gateway: Option<String>,

    /// Record key; overrides gateway.key
    #[arg(short, long)]
    key: Option<String>,

    /// Storage hint; overrides gateway.storage
    #[arg(short, long)]
    storage: Option<String>,

    /// File holding the JSON record; stdin when omitted
    record: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    logging::init_logging(&config.observability.log_level);

    let text = match &cli.record {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let record: serde_json::Value = serde_json::from_str(&text)?;

    let gateway = cli.gateway.unwrap_or(config.gateway.address);
    let address: Address = gateway.parse()?;
    let key = cli.key.unwrap_or(config.gateway.key);
    let storage = cli.storage.unwrap_or(config.gateway.storage);

    let mut client = GatewayClient::new(address, config.stream.buffer_limit)
        .with_connect_timeout(config.timeouts.connect());
    let outcome = push_with_retry(&mut client, &key, &record, &storage, &config.retries).await;
    client.close().await;

    match outcome {
        PushOutcome::Accepted => {
            println!("accepted");
            Ok(ExitCode::SUCCESS)
        }
        PushOutcome::Rejected { code, body } => {
            eprintln!("rejected ({code}): {}", String::from_utf8_lossy(&body));
            Ok(ExitCode::from(2))
        }
        PushOutcome::Failed { attempts } => {
            eprintln!("failed after {attempts} attempts");
            Ok(ExitCode::FAILURE)
        }
    }
}
