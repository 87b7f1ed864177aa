//! Issuetrack HTTP server binary.

use clap::Parser;
use issuetrack_server::config::{Args, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::resolve(&args).await?;

    // RUST_LOG takes precedence over the configured filter
    // Example: RUST_LOG=issuetrack=debug,tower_http=debug issuetrack-server
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting issuetrack-server");

    issuetrack_server::server::run(&config).await?;

    tracing::info!("Server stopped");
    Ok(())
}
