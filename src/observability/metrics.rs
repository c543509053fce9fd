//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, outcome
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_handshakes_total` (counter): issued / renewed / acknowledged
//! - `gateway_rate_limited_total` (counter): rejections by tier
//! - `gateway_active_sessions` (gauge): sessions held by the registry
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps unit tests quiet
//! - Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_handshake(outcome: &'static str) {
    metrics::counter!("gateway_handshakes_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited(tier: &str) {
    metrics::counter!("gateway_rate_limited_total", "tier" => tier.to_string()).increment(1);
}

pub fn record_active_sessions(count: usize) {
    metrics::gauge!("gateway_active_sessions").set(count as f64);
}
