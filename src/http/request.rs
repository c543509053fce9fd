//! Request screening and identification.
//!
//! # Responsibilities
//! - Derive the client identity from the peer address
//! - Generate a unique request ID (UUID v4)
//! - Screen requests that carry no User-Agent
//!
//! # Design Decisions
//! - Identity is the canonical peer IP; IPv4-mapped IPv6 collapses to IPv4
//! - Request ID added as early as possible for tracing

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Session key for a peer address.
pub fn client_identity(ip: IpAddr) -> String {
    ip.to_canonical().to_string()
}

/// Whether the request carries a non-empty User-Agent header.
pub fn has_user_agent(headers: &HeaderMap) -> bool {
    headers
        .get(header::USER_AGENT)
        .map(|value| !value.as_bytes().is_empty())
        .unwrap_or(false)
}

/// Request ID of a request, or `unknown` when none was assigned.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Issues a fresh UUID v4 for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}
