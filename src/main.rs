//! Hermes - Messaging-session lifecycle service
//!
//! CLI entry point for the Hermes server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod plan;
mod server;

/// Messaging-session lifecycle service for the Hermes CRM
#[derive(Debug, Parser)]
#[command(name = "hermes", version)]
struct Cli {
    /// Bind address, overrides HERMES_HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides HERMES_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hermes=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = server::AppConfig::from_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    info!("Starting Hermes v{}", env!("CARGO_PKG_VERSION"));
    server::run(config).await
}
