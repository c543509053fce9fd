//! Route endpoints and their handlers.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

/// Classification tag handed to clients so they can pick endpoints by role
/// without knowing real paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointKind {
    /// Entry point of the public API.
    ApiRoot,
    /// Unauthenticated informational endpoint.
    Public,
    /// Operator endpoint.
    Admin,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::ApiRoot => "API_ROOT",
            EndpointKind::Public => "PUBLIC",
            EndpointKind::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "API_ROOT" => Ok(EndpointKind::ApiRoot),
            "PUBLIC" => Ok(EndpointKind::Public),
            "ADMIN" => Ok(EndpointKind::Admin),
            other => Err(format!("unknown endpoint kind: {}", other)),
        }
    }
}

type BoxedHandler = dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync;

/// Request handler attached to an endpoint.
///
/// The routing core only stores and hands it back; the transport layer invokes it.
#[derive(Clone)]
pub struct Handler(Arc<BoxedHandler>);

impl Handler {
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        Self(Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
            let fut = f(req);
            async move { fut.await.into_response() }.boxed()
        }))
    }

    /// Run the handler for a request.
    pub async fn call(&self, request: Request<Body>) -> Response {
        (self.0)(request).await
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// A named, typed leaf route owned by a container.
#[derive(Debug, Clone)]
pub struct RouteEndpoint {
    /// Endpoint name; empty for the container's index route.
    pub name: String,
    pub kind: EndpointKind,
    pub handler: Handler,
}

impl RouteEndpoint {
    pub fn is_index(&self) -> bool {
        self.name.is_empty()
    }

    /// Case-insensitive name comparison; `None` and `""` both denote the index route.
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        let name = name.unwrap_or("");
        self.name.eq_ignore_ascii_case(name)
    }
}
