//! Garudata server binary
//!
//! Run with: cargo run -p garudata --bin garudata-server -- --config garudata.toml

use anyhow::Context;
use clap::Parser;
use garudata::{config::GarudataConfig, server::GarudataServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Convert tabular files to JSON collections and search them over HTTP
#[derive(Debug, Parser)]
#[command(name = "garudata-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long, short = 'c', env = "GARUDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long, short = 'p')]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "garudata=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GarudataConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GarudataConfig::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Collections: {}", config.storage.collections_dir.display());
    tracing::info!("  - Uploads: {}", config.storage.uploads_dir.display());
    tracing::info!("  - Catalog: {}", config.storage.catalog_path.display());
    tracing::info!("  - Conversion timeout: {}s", config.conversion.timeout_secs);

    let server = GarudataServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
