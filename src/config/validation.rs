//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, token size bounded)
//! - Validate addresses and the handshake signal
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::Method;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::session::token::TOKEN_BYTES_RANGE;

/// A single semantic problem in a configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("handshake.method: invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("handshake.path: must start with '/', got {0:?}")]
    InvalidHandshakePath(String),

    #[error("{0}: must be greater than zero")]
    Zero(&'static str),

    #[error("session.token_bytes: {0} is outside 4..=32")]
    TokenSize(usize),

    #[error("rate_limit.tiers: {0}")]
    Tier(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }

    let method = config.handshake.method.as_str();
    if method.is_empty() || Method::from_bytes(method.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidMethod(config.handshake.method.clone()));
    }
    if !config.handshake.path.starts_with('/') {
        errors.push(ValidationError::InvalidHandshakePath(config.handshake.path.clone()));
    }

    if config.session.idle_timeout_secs == 0 {
        errors.push(ValidationError::Zero("session.idle_timeout_secs"));
    }
    if !TOKEN_BYTES_RANGE.contains(&config.session.token_bytes) {
        errors.push(ValidationError::TokenSize(config.session.token_bytes));
    }

    let mut names = HashSet::new();
    for tier in &config.rate_limit.tiers {
        if tier.name.is_empty() {
            errors.push(ValidationError::Tier("tier name must not be empty".into()));
        } else if !names.insert(tier.name.as_str()) {
            errors.push(ValidationError::Tier(format!("duplicate tier {:?}", tier.name)));
        }
        if tier.points == 0 || tier.window_secs == 0 {
            errors.push(ValidationError::Tier(format!(
                "tier {:?} needs points and window_secs greater than zero",
                tier.name
            )));
        }
    }
    if config.rate_limit.enabled && config.rate_limit.tiers.is_empty() {
        errors.push(ValidationError::Tier("rate limiting enabled without tiers".into()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
