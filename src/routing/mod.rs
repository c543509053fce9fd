//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Namespace registration (at startup):
//!     routes/ builder
//!     → tree.rs (create_path / add_endpoint, segment validation)
//!     → Freeze as Arc<RouteTree>
//!
//! Per request:
//!     session/ resolves an opaque token path
//!     → RouteEndpoint (kind + handler)
//!     → http/ invokes the handler
//! ```
//!
//! # Design Decisions
//! - Tree is immutable at runtime (shared without locks)
//! - Names compare case-insensitively; segments limited to letters, digits and `-`
//! - Real paths are diagnostic only; clients only ever see tokens

pub mod endpoint;
pub mod error;
pub mod tree;

pub use endpoint::{EndpointKind, Handler, RouteEndpoint};
pub use error::{RouteError, RouteResult};
pub use tree::{ContainerId, RouteContainer, RouteTree};
