//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics → route namespace → server → watcher, signals, console → serve
//!
//! Shutdown (shutdown.rs):
//!     Trigger → server stops accepting → in-flight requests finish → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a namespace registration error aborts startup
//! - The listener binds last, after the tree is frozen

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
