//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (rate limit, request ID, tracing, timeout, body limit)
//! - Bind server to listener
//! - Dispatch requests through the session registry
//! - Apply hot-reloadable config updates

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::Request,
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::watcher::{reload_action, ReloadAction};
use crate::config::{GatewayConfig, SecurityConfig};
use crate::http::request::{client_identity, has_user_agent, request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::{bad_request, handshake_response, not_found, rejection_response};
use crate::observability::metrics;
use crate::routing::{RouteError, RouteTree};
use crate::security::rate_limit::{rate_limit_middleware, RateLimitPolicy, WindowedRateLimiter};
use crate::session::{Dispatch, SessionRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub security: SecurityConfig,
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<SessionRegistry>,
    rate_limiter: Arc<WindowedRateLimiter>,
}

impl GatewayServer {
    /// Create a server over a frozen route tree.
    pub fn new(config: GatewayConfig, tree: Arc<RouteTree>) -> Self {
        let registry = Arc::new(SessionRegistry::with_options(tree, config.registry_options()));
        let rate_limiter = Arc::new(WindowedRateLimiter::new(config.rate_limit.clone()));

        let state = AppState {
            registry: registry.clone(),
            security: config.security.clone(),
        };

        let router = Self::build_router(&config, state, rate_limiter.clone());
        Self {
            router,
            config,
            registry,
            rate_limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState, policy: Arc<dyn RateLimitPolicy>) -> Router {
        Router::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(policy, rate_limit_middleware))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let limiter = self.rate_limiter.clone();
        let mut current = self.config.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(next) => {
                            apply_reload(&current, &next, &limiter);
                            current = next;
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn rate_limiter(&self) -> Arc<WindowedRateLimiter> {
        self.rate_limiter.clone()
    }
}

/// Apply the hot-reloadable parts of a new configuration.
fn apply_reload(current: &GatewayConfig, next: &GatewayConfig, limiter: &WindowedRateLimiter) {
    match reload_action(current, next) {
        ReloadAction::Unchanged => {}
        ReloadAction::RestartRequired => {
            tracing::warn!("Config changes outside [rate_limit] take effect after restart")
        }
        ReloadAction::Apply { restart_also } => {
            limiter.reconfigure(next.rate_limit.clone());
            if restart_also {
                tracing::warn!("Config changes outside [rate_limit] take effect after restart");
            }
        }
    }
}

async fn wait_for_shutdown(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}

/// Catch-all handler: handshake, or dispatch through the caller's session.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let identity = client_identity(addr.ip());
    let request_id = request_id(&request);

    if state.security.require_user_agent && !has_user_agent(request.headers()) {
        tracing::debug!(request_id = %request_id, client = %identity, "Declining request without user agent");
        metrics::record_request(method.as_str(), 400, "no_user_agent", start);
        return bad_request();
    }

    if state.security.ignore_favicon
        && path.starts_with("/favicon")
        && state.registry.has_session(&identity)
    {
        tracing::debug!(request_id = %request_id, client = %identity, "Ignoring favicon request");
        metrics::record_request(method.as_str(), 404, "favicon", start);
        return not_found();
    }

    let (response, outcome) = match state.registry.dispatch(&identity, &method, &path) {
        Ok(Dispatch::Handshake(handshake)) => {
            tracing::debug!(request_id = %request_id, client = %identity, "Handshake");
            (handshake_response(handshake), "handshake")
        }
        Ok(Dispatch::Endpoint(endpoint)) => {
            tracing::debug!(
                request_id = %request_id,
                client = %identity,
                method = %method,
                kind = %endpoint.kind,
                "Dispatching request"
            );
            (endpoint.handler.call(request).await, "dispatched")
        }
        Err(error) => {
            let outcome = match error {
                RouteError::SetupRequired => "setup_required",
                _ => "unknown_route",
            };
            tracing::debug!(
                request_id = %request_id,
                client = %identity,
                method = %method,
                outcome = outcome,
                "Request rejected"
            );
            (rejection_response(&error, &method), outcome)
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start);
    response
}
