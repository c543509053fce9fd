//! Token gateway server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ rate limit ──▶ gateway handler ──▶ SessionRegistry
//!                                                             │
//!                              handshake? ◀───────────────────┤
//!                              issue route map                │
//!                                                             ▼
//!                                              Session (token → container / endpoint)
//!                                                             │
//!                                                             ▼
//!     Client Response ◀────────────────────────────── RouteTree endpoint handler
//! ```

use std::path::PathBuf;

use clap::Parser;
use token_gateway::config::load_config;
use token_gateway::lifecycle::startup;
use token_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "token-gateway")]
#[command(about = "Moving-target route gateway", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    init_logging(&config.observability.log_level);
    tracing::info!("token-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        rate_limit = config.rate_limit.enabled,
        idle_timeout_secs = config.session.idle_timeout_secs,
        "Configuration loaded"
    );

    startup::start(config, args.config).await
}
