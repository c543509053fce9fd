//! Moving-target sessions.
//!
//! # Data Flow
//! ```text
//! Handshake (method + path signal):
//!     registry.rs (absent or stale?)
//!     → mapping.rs walks the RouteTree, token.rs draws a token per node
//!     → route map [{kind, route}] returned to the client
//!
//! Any other request:
//!     registry.rs (session for identity? else SetupRequired)
//!     → mapping.rs splits /<dir tokens>/<endpoint token>
//!     → RouteEndpoint or UnknownRoute
//! ```
//!
//! # Design Decisions
//! - One session per client identity (network address)
//! - Tokens differ per session, so leaked routes are useless to other clients
//! - No background eviction; idle sessions are replaced on re-handshake

pub mod mapping;
pub mod registry;
pub mod token;

pub use mapping::{RouteMapEntry, Session};
pub use registry::{
    Dispatch, Handshake, HandshakeSignal, RegistryOptions, SessionRegistry, DEFAULT_IDLE_THRESHOLD,
};
pub use token::{RandomTokens, TokenSource, TOKEN_BYTES_RANGE};
