//! Process-wide session table keyed by client identity.
//!
//! # Responsibilities
//! - Create a session on handshake, replace it once idle
//! - Reject non-handshake traffic from identities without a session
//! - Route everything else through the caller's session
//!
//! # Design Decisions
//! - `DashMap` shards the table so different identities rarely contend
//! - Check-then-replace for one identity happens under that entry's lock;
//!   concurrent handshakes yield exactly one canonical session
//! - Sessions are built outside the lock and discarded if another handshake won
//! - Stale sessions are only replaced lazily on the owner's next handshake

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::Method;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::observability::metrics;
use crate::routing::{RouteEndpoint, RouteError, RouteResult, RouteTree};
use crate::session::mapping::{RouteMapEntry, Session};
use crate::session::token::{collision_probability, RandomTokens, DEFAULT_TOKEN_BYTES};

/// Idle window after which a session is replaced on the next handshake.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// The `(method, path)` pair that requests a token map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSignal {
    pub method: Method,
    pub path: String,
}

impl HandshakeSignal {
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        *method == self.method && path == self.path
    }
}

impl Default for HandshakeSignal {
    fn default() -> Self {
        Self {
            method: Method::PATCH,
            path: "/".to_string(),
        }
    }
}

/// Outcome of a handshake request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// A new session was created; its full route map goes back to the client.
    Issued(Vec<RouteMapEntry>),
    /// The existing session is still fresh; nothing new is issued.
    Acknowledged,
}

/// Outcome of a request that passed session checks.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Handshake(Handshake),
    Endpoint(RouteEndpoint),
}

/// Registry settings.
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub idle_threshold: Duration,
    pub token_bytes: usize,
    pub handshake: HandshakeSignal,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            token_bytes: DEFAULT_TOKEN_BYTES,
            handshake: HandshakeSignal::default(),
        }
    }
}

/// Map from client identity to its session.
#[derive(Debug)]
pub struct SessionRegistry {
    tree: Arc<RouteTree>,
    sessions: DashMap<String, Session>,
    options: RegistryOptions,
}

impl SessionRegistry {
    pub fn new(tree: Arc<RouteTree>) -> Self {
        Self::with_options(tree, RegistryOptions::default())
    }

    pub fn with_options(tree: Arc<RouteTree>, options: RegistryOptions) -> Self {
        let largest_map = tree
            .depth_first()
            .into_iter()
            .map(|id| tree.container(id).endpoints().len())
            .max()
            .unwrap_or(0)
            .max(tree.container_count());

        tracing::info!(
            containers = tree.container_count(),
            endpoints = tree.endpoint_count(),
            token_bytes = options.token_bytes,
            idle_threshold_secs = options.idle_threshold.as_secs(),
            collision_bound = collision_probability(largest_map, options.token_bytes),
            "Session registry ready"
        );

        Self {
            tree,
            sessions: DashMap::new(),
            options,
        }
    }

    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.tree
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn is_handshake(&self, method: &Method, path: &str) -> bool {
        self.options.handshake.matches(method, path)
    }

    /// Route a request: handshake, or resolve through the caller's session.
    pub fn dispatch(&self, identity: &str, method: &Method, path: &str) -> RouteResult<Dispatch> {
        self.dispatch_at(identity, method, path, Instant::now())
    }

    pub fn dispatch_at(
        &self,
        identity: &str,
        method: &Method,
        path: &str,
        now: Instant,
    ) -> RouteResult<Dispatch> {
        if self.is_handshake(method, path) {
            return Ok(Dispatch::Handshake(self.handshake_at(identity, now)));
        }
        self.resolve_at(identity, path, now).map(Dispatch::Endpoint)
    }

    pub fn handshake(&self, identity: &str) -> Handshake {
        self.handshake_at(identity, Instant::now())
    }

    /// Create or renew the session for `identity` as of `now`.
    pub fn handshake_at(&self, identity: &str, now: Instant) -> Handshake {
        if !self.needs_session(identity, now) {
            metrics::record_handshake("acknowledged");
            return Handshake::Acknowledged;
        }

        let fresh = self.build_session(now);

        let outcome = match self.sessions.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_idle(now, self.options.idle_threshold) {
                    let routes = fresh.route_map();
                    entry.insert(fresh);
                    tracing::debug!(identity = %identity, routes = routes.len(), "Stale session replaced");
                    metrics::record_handshake("renewed");
                    Handshake::Issued(routes)
                } else {
                    metrics::record_handshake("acknowledged");
                    Handshake::Acknowledged
                }
            }
            Entry::Vacant(entry) => {
                let routes = fresh.route_map();
                entry.insert(fresh);
                tracing::debug!(identity = %identity, routes = routes.len(), "Session issued");
                metrics::record_handshake("issued");
                Handshake::Issued(routes)
            }
        };

        metrics::record_active_sessions(self.sessions.len());
        outcome
    }

    pub fn resolve(&self, identity: &str, path: &str) -> RouteResult<RouteEndpoint> {
        self.resolve_at(identity, path, Instant::now())
    }

    /// Resolve a token path through the caller's session.
    pub fn resolve_at(&self, identity: &str, path: &str, now: Instant) -> RouteResult<RouteEndpoint> {
        let mut session = self
            .sessions
            .get_mut(identity)
            .ok_or(RouteError::SetupRequired)?;
        session.resolve(path, now)
    }

    /// Token map currently held by `identity`, if any.
    pub fn route_map(&self, identity: &str) -> Option<Vec<RouteMapEntry>> {
        self.sessions.get(identity).map(|session| session.route_map())
    }

    pub fn last_access(&self, identity: &str) -> Option<Instant> {
        self.sessions.get(identity).map(|session| session.last_access())
    }

    pub fn has_session(&self, identity: &str) -> bool {
        self.sessions.contains_key(identity)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions past the idle threshold that are still held until re-handshake.
    pub fn idle_count(&self, now: Instant) -> usize {
        self.sessions
            .iter()
            .filter(|session| session.is_idle(now, self.options.idle_threshold))
            .count()
    }

    fn needs_session(&self, identity: &str, now: Instant) -> bool {
        self.sessions
            .get(identity)
            .map(|session| session.is_idle(now, self.options.idle_threshold))
            .unwrap_or(true)
    }

    fn build_session(&self, now: Instant) -> Session {
        let mut tokens = RandomTokens::new(self.options.token_bytes);
        Session::with_tokens(self.tree.clone(), now, &mut tokens)
    }
}
