//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address = client identity)
//!     → server.rs (Axum setup, middleware stack)
//!     → security/rate_limit.rs (per-identity limits)
//!     → request.rs (request ID, User-Agent screening)
//!     → session registry (handshake or token resolution)
//!     → endpoint handler, or response.rs (uniform rejections)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{client_identity, MakeRequestUuid, X_REQUEST_ID};
pub use response::RouteMapResponse;
pub use server::{AppState, GatewayServer};
