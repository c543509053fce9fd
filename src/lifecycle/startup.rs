//! Startup orchestration.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{ConfigWatcher, GatewayConfig};
use crate::console::{spawn_console, ConsoleContext};
use crate::http::GatewayServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::metrics;
use crate::routes::build_namespace;

/// Bring the gateway up and serve until shutdown.
///
/// `config_path` enables hot reload of the file the config was loaded from.
pub async fn start(
    config: GatewayConfig,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tree = build_namespace()?;
    tracing::info!(
        containers = tree.container_count(),
        endpoints = tree.endpoint_count(),
        "Route namespace frozen"
    );

    let console_enabled = config.console.enabled;
    let bind_address = config.listener.bind_address.clone();
    let initial = config.clone();
    let server = GatewayServer::new(config, Arc::new(tree));

    // The watcher stops when dropped, so it lives until `start` returns.
    let (_watcher, config_updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path, initial);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    if console_enabled {
        spawn_console(ConsoleContext {
            registry: server.registry(),
            shutdown: shutdown.clone(),
        });
    }

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
