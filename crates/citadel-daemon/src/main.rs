//! Citadel Daemon - Role-gated authority delegation service
//!
//! The citadel daemon provides:
//! - REST API for accounts, Mantles, site state, and panic alerts
//! - Delegation-aware role resolution on every request
//! - Site-wide shutdown gating with an HQ bypass
//! - Background sweep of expired Mantles

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use citadel_daemon::config::DaemonConfig;
use citadel_daemon::error::{DaemonError, DaemonResult};
use citadel_daemon::server::Server;

/// Citadel Daemon CLI
#[derive(Parser)]
#[command(name = "citadeld")]
#[command(about = "Citadel Daemon - Role-gated authority delegation service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CITADEL_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(
        short,
        long,
        env = "CITADEL_LISTEN_ADDR",
        default_value = "127.0.0.1:8080"
    )]
    listen: String,

    /// Log level
    #[arg(long, env = "CITADEL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "CITADEL_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    config.server.listen_addr = cli
        .listen
        .parse()
        .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        "starting citadel daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
