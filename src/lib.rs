//! Moving-target route gateway library.
//!
//! Each client receives its own randomized token for every container and
//! endpoint of a fixed route namespace, and can only reach handlers through
//! those tokens.

pub mod client;
pub mod config;
pub mod console;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routes;
pub mod routing;
pub mod security;
pub mod session;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use routing::RouteTree;
pub use session::SessionRegistry;
