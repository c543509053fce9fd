//! HTTP client for the gateway.
//!
//! Performs the handshake, keeps the issued route map and calls endpoints by
//! their kind. Used by the `gateway-cli` binary and the integration tests.
//!
//! A map is only issued once per session, so short-lived callers persist it
//! in a [`RouteCache`] and reload it when the gateway just acknowledges.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::{Client, Method, Response, StatusCode};
use thiserror::Error;

use crate::http::RouteMapResponse;
use crate::routing::EndpointKind;
use crate::session::RouteMapEntry;

/// User agent sent on every request; the gateway declines requests without one.
pub const USER_AGENT: &str = concat!("gateway-cli/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid route map: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("route cache: {0}")]
    Io(#[from] io::Error),

    #[error("no route known for {0}; handshake first")]
    NoRoute(EndpointKind),
}

/// Outcome of [`GatewayClient::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    /// The gateway issued a new map.
    Issued,
    /// The session was still fresh; the cached map was loaded.
    Cached,
    /// The session was still fresh and no cached map exists.
    Missing,
}

/// Route map persisted on disk, one file per gateway URL.
#[derive(Debug, Clone)]
pub struct RouteCache {
    path: PathBuf,
}

impl RouteCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file for `base_url` inside `dir`.
    pub fn for_gateway(dir: &Path, base_url: &str) -> Self {
        let key: String = base_url
            .trim_end_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        Self::new(dir.join(format!("gateway-routes-{key}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored map, or `None` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<Vec<RouteMapEntry>>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn store(&self, routes: &[RouteMapEntry]) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string(routes)?)?;
        Ok(())
    }
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    handshake_method: Method,
    handshake_path: String,
    routes: Mutex<Vec<RouteMapEntry>>,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Use a preconfigured client. It must send a `User-Agent` header.
    pub fn with_client(base_url: &str, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            handshake_method: Method::PATCH,
            handshake_path: "/".to_string(),
            routes: Mutex::new(Vec::new()),
        }
    }

    /// Match a gateway whose handshake signal is not `PATCH /`.
    pub fn with_handshake(mut self, method: Method, path: &str) -> Self {
        self.handshake_method = method;
        self.handshake_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the handshake signal.
    ///
    /// Returns the newly issued route map, or an empty list when the gateway
    /// only acknowledged because the current session is still fresh. The
    /// remembered map is replaced only when a new one is issued.
    pub async fn handshake(&self) -> Result<Vec<RouteMapEntry>, ClientError> {
        let response = self
            .client
            .request(
                self.handshake_method.clone(),
                format!("{}{}", self.base_url, self.handshake_path),
            )
            .send()
            .await?;
        let text = success_text(response).await?;

        if text.trim().is_empty() {
            tracing::debug!("Handshake acknowledged, keeping current routes");
            return Ok(Vec::new());
        }

        let issued: RouteMapResponse = serde_json::from_str(&text)?;
        tracing::debug!(routes = issued.routes.len(), "Route map issued");
        self.remember(issued.routes.clone());
        Ok(issued.routes)
    }

    /// Handshake, persisting a new map to `cache` or falling back to it.
    pub async fn connect(&self, cache: &RouteCache) -> Result<RouteSource, ClientError> {
        let issued = self.handshake().await?;
        if !issued.is_empty() {
            cache.store(&issued)?;
            return Ok(RouteSource::Issued);
        }

        match cache.load()? {
            Some(routes) => {
                tracing::debug!(path = ?cache.path(), "Using cached route map");
                self.remember(routes);
                Ok(RouteSource::Cached)
            }
            None => Ok(RouteSource::Missing),
        }
    }

    /// Replace the remembered route map.
    pub fn remember(&self, routes: Vec<RouteMapEntry>) {
        if let Ok(mut current) = self.routes.lock() {
            *current = routes;
        }
    }

    /// Token route of the first endpoint of `kind` in the remembered map.
    pub fn route_for(&self, kind: EndpointKind) -> Option<String> {
        self.routes
            .lock()
            .ok()?
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.route.clone())
    }

    /// `GET` the endpoint of `kind` through its token route.
    pub async fn call(&self, kind: EndpointKind) -> Result<Response, ClientError> {
        let route = self.route_for(kind).ok_or(ClientError::NoRoute(kind))?;
        Ok(self
            .client
            .get(format!("{}{}", self.base_url, route))
            .send()
            .await?)
    }
}

async fn success_text(response: Response) -> Result<String, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status { status, body });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gateway-client-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_base_url_normalized() {
        let client = GatewayClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_handshake_path_normalized() {
        let client = GatewayClient::new("http://localhost:8080")
            .unwrap()
            .with_handshake(Method::POST, "hello");
        assert_eq!(client.handshake_method, Method::POST);
        assert_eq!(client.handshake_path, "/hello");
    }

    #[test]
    fn test_no_route_before_handshake() {
        let client = GatewayClient::new("http://localhost:8080").unwrap();
        assert_eq!(client.route_for(EndpointKind::ApiRoot), None);

        client.remember(vec![RouteMapEntry {
            kind: EndpointKind::ApiRoot,
            route: "/a/b/c".into(),
        }]);
        assert_eq!(client.route_for(EndpointKind::ApiRoot).unwrap(), "/a/b/c");
    }

    #[tokio::test]
    async fn test_call_without_route_fails() {
        let client = GatewayClient::new("http://localhost:8080").unwrap();
        let err = client.call(EndpointKind::Admin).await.unwrap_err();
        assert!(matches!(err, ClientError::NoRoute(EndpointKind::Admin)));
    }

    #[test]
    fn test_cache_is_keyed_by_url() {
        let dir = scratch_dir("keys");
        let a = RouteCache::for_gateway(&dir, "http://127.0.0.1:8080/");
        let b = RouteCache::for_gateway(&dir, "http://127.0.0.1:9090");
        assert_ne!(a.path(), b.path());
        assert_eq!(
            a.path().file_name().unwrap(),
            "gateway-routes-http___127_0_0_1_8080.json"
        );
    }

    #[test]
    fn test_cache_store_and_load() {
        let dir = scratch_dir("store");
        let cache = RouteCache::for_gateway(&dir, "http://localhost");
        let _ = fs::remove_file(cache.path());
        assert!(cache.load().unwrap().is_none());

        let routes = vec![RouteMapEntry {
            kind: EndpointKind::Public,
            route: "/x/y/z".into(),
        }];
        cache.store(&routes).unwrap();
        assert_eq!(cache.load().unwrap().unwrap(), routes);

        let _ = fs::remove_dir_all(&dir);
    }
}
