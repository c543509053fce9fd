//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → http/request.rs (User-Agent screening)
//!     → rate_limit.rs (per-identity tiered limits)
//!     → session registry (handshake / dispatch)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any screening failure
//! - No trust in client input; identities come from the socket, not headers
//! - Rejections never reveal which routes exist

pub mod rate_limit;

pub use rate_limit::{RateDecision, RateLimitPolicy, WindowedRateLimiter};
