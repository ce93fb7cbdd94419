//! Pack gateway binary entry point.
//!
//! Loads TOML configuration, binds the axum server, and runs until ctrl-c.

use anyhow::Result;
use clap::Parser;
use pack_gateway::{GatewayConfig, config::CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Live group-run tracking gateway.
#[derive(Parser, Debug)]
#[command(name = "pack-gateway", about = "Live group-run tracking gateway")]
struct Cli {
    /// Path to the TOML config. Defaults to `pack.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address (host:port). Overrides the config file and `PORT`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing from RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match cli.config {
        Some(path) => GatewayConfig::load(&path)?,
        None if std::path::Path::new(CONFIG_FILE).exists() => {
            GatewayConfig::load(std::path::Path::new(CONFIG_FILE))?
        }
        None => GatewayConfig::default(),
    };
    config.apply_env();

    let bind = cli.bind.unwrap_or_else(|| config.bind_address());
    let handle = pack_gateway::serve(&config, &bind).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("received ctrl-c, shutting down");
    handle.shutdown().await?;
    tracing::info!("gateway shut down");
    Ok(())
}
