//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment (PORT, RATE_LIMIT)
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server applies hot-reloadable sections (rate limits)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Route tree and session settings are fixed for the process lifetime

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ConsoleConfig, GatewayConfig, HandshakeConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, RateLimitTier, SecurityConfig, SessionConfig, TimeoutConfig,
};
pub use watcher::{reload_action, ConfigWatcher, ReloadAction};
