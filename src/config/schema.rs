//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::session::{HandshakeSignal, RegistryOptions};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Request that issues or renews a token map.
    pub handshake: HandshakeConfig,

    /// Session lifetime and token sizing.
    pub session: SessionConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request screening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator console.
    pub console: ConsoleConfig,
}

impl GatewayConfig {
    /// Session registry settings derived from this configuration.
    ///
    /// Call after validation; an unparseable handshake method falls back to `PATCH`.
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            idle_threshold: self.session.idle_timeout(),
            token_bytes: self.session.token_bytes,
            handshake: HandshakeSignal {
                method: Method::from_bytes(self.handshake.method.as_bytes()).unwrap_or(Method::PATCH),
                path: self.handshake.path.clone(),
            },
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            max_connections: 10_000,
        }
    }
}

/// The handshake signal.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HandshakeConfig {
    /// HTTP method of the handshake request.
    pub method: String,

    /// Path of the handshake request.
    pub path: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            method: "PATCH".to_string(),
            path: "/".to_string(),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity after which a session is replaced on the next handshake.
    pub idle_timeout_secs: u64,

    /// Random bytes per token (hex-encoded, so tokens are twice as long).
    pub token_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 600,
            token_bytes: 6,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Limits applied in order; a request must pass every tier.
    pub tiers: Vec<RateLimitTier>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tiers: vec![
                RateLimitTier {
                    name: "rl250".to_string(),
                    points: 250,
                    window_secs: 10 * 60,
                    block_secs: 10,
                },
                RateLimitTier {
                    name: "rl500".to_string(),
                    points: 500,
                    window_secs: 15 * 60,
                    block_secs: 5 * 60,
                },
            ],
        }
    }
}

/// A fixed-window limit.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RateLimitTier {
    /// Tier name used in logs and metrics.
    pub name: String,

    /// Requests allowed per window.
    pub points: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// How long an identity stays blocked after exceeding the tier.
    #[serde(default)]
    pub block_secs: u64,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request screening configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Decline requests that carry no User-Agent header.
    pub require_user_agent: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Answer `/favicon*` with 404 without consulting the session.
    pub ignore_favicon: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_user_agent: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
            ignore_favicon: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Operator console configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Read commands from stdin.
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
