//! Routing error kinds.
//!
//! Registration errors (`InvalidSegment`, `DuplicateEndpoint`) are raised while
//! the namespace is being built and abort startup. Resolution errors
//! (`UnknownRoute`, `SetupRequired`) are routine traffic and are mapped to
//! uniform HTTP responses by the transport layer.

use axum::http::{Method, StatusCode};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Segment or endpoint name is empty or contains characters outside `[a-z0-9-]`.
    #[error("Invalid segment {0:?}: only letters, numbers and - are allowed")]
    InvalidSegment(String),

    /// An endpoint with the same (case-insensitive) name already exists in the container.
    #[error("Duplicate endpoint {name:?} under {container}")]
    DuplicateEndpoint { container: String, name: String },

    /// The token path does not resolve in the caller's session.
    #[error("Unknown route")]
    UnknownRoute,

    /// The caller has no session and did not send the handshake request.
    #[error("Setup required")]
    SetupRequired,
}

impl RouteError {
    /// Whether this error can only happen while the namespace is registered.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            RouteError::InvalidSegment(_) | RouteError::DuplicateEndpoint { .. }
        )
    }

    /// HTTP status reported to the client for a resolution failure.
    ///
    /// `HEAD` requests for unknown routes get a bare 200 so scanners cannot
    /// tell real routes apart by status.
    pub fn status_for(&self, method: &Method) -> StatusCode {
        match self {
            RouteError::UnknownRoute if method == Method::HEAD => StatusCode::OK,
            RouteError::UnknownRoute => StatusCode::NOT_FOUND,
            RouteError::SetupRequired => StatusCode::UNAUTHORIZED,
            RouteError::InvalidSegment(_) | RouteError::DuplicateEndpoint { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type alias for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;
