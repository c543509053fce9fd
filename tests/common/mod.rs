//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use token_gateway::client::{GatewayClient, USER_AGENT};
use token_gateway::config::{GatewayConfig, RateLimitTier};
use token_gateway::routes::build_namespace;
use token_gateway::{GatewayServer, SessionRegistry, Shutdown};

/// A gateway serving on an ephemeral local port. Dropping it stops the server.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub registry: Arc<SessionRegistry>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Deliver a reloaded configuration, as the file watcher would.
    pub fn reload(&self, config: GatewayConfig) {
        self.updates.send(config).unwrap();
    }

    /// A gateway client that bypasses any system proxy.
    pub fn client(&self) -> GatewayClient {
        GatewayClient::with_client(&self.base_url(), http_client())
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config for tests: local bind, no console, limits off.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.console.enabled = false;
    config.rate_limit.enabled = false;
    config
}

/// Config with a single small rate-limit tier.
pub fn rate_limited_config(points: u32, block_secs: u64) -> GatewayConfig {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.tiers = vec![RateLimitTier {
        name: "test".to_string(),
        points,
        window_secs: 60,
        block_secs,
    }];
    config
}

/// Start the gateway with the production namespace.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let tree = Arc::new(build_namespace().unwrap());
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = GatewayServer::new(config, tree);
    let registry = server.registry();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (updates, config_updates) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        registry,
        updates,
        shutdown,
    }
}

/// Raw HTTP client with a user agent.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .no_proxy()
        .build()
        .unwrap()
}

/// Raw HTTP client that sends no user agent.
pub fn anonymous_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
