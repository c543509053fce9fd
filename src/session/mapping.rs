//! Per-client token mapping over the route tree.
//!
//! # Responsibilities
//! - Assign a fresh token to every container and every endpoint
//! - Resolve `/<dir tokens...>/<endpoint token>` back to an endpoint
//! - Enumerate the token routes handed out on handshake
//!
//! # Design Decisions
//! - Directory keys chain tokens from the root: `/<root>/<child>/...`
//! - Tokens are unique within the map holding them; a colliding draw is retried
//! - Every resolution failure is the same `UnknownRoute`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::routing::{ContainerId, EndpointKind, RouteEndpoint, RouteError, RouteResult, RouteTree};
use crate::session::token::{RandomTokens, TokenSource};

/// One handshake entry: an endpoint kind and the token path addressing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteMapEntry {
    pub kind: EndpointKind,
    pub route: String,
}

/// A client's private, randomized view of the route tree.
#[derive(Debug)]
pub struct Session {
    tree: Arc<RouteTree>,
    last_access: Instant,
    /// Directory key → container.
    directories: HashMap<String, ContainerId>,
    /// Per container: endpoint token → index into the container's endpoints.
    endpoints: HashMap<ContainerId, HashMap<String, usize>>,
}

impl Session {
    /// Build a session with OS-random tokens of the default size.
    pub fn new(tree: Arc<RouteTree>, now: Instant) -> Self {
        Self::with_tokens(tree, now, &mut RandomTokens::default())
    }

    /// Build a session drawing tokens from `tokens`.
    pub fn with_tokens(tree: Arc<RouteTree>, now: Instant, tokens: &mut impl TokenSource) -> Self {
        let mut directories = HashMap::with_capacity(tree.container_count());
        let mut endpoints = HashMap::with_capacity(tree.container_count());
        let mut keys: Vec<Option<String>> = vec![None; tree.container_count()];

        for id in tree.depth_first() {
            let container = tree.container(id);
            let parent_key = container
                .parent()
                .and_then(|parent| keys[parent.index()].as_deref())
                .unwrap_or("");

            let key = unique_token(tokens, |token| {
                let key = format!("{}/{}", parent_key, token);
                (!directories.contains_key(&key)).then_some(key)
            });

            let mut endpoint_tokens = HashMap::with_capacity(container.endpoints().len());
            for index in 0..container.endpoints().len() {
                let token = unique_token(tokens, |token| {
                    (!endpoint_tokens.contains_key(&token)).then_some(token)
                });
                endpoint_tokens.insert(token, index);
            }

            directories.insert(key.clone(), id);
            endpoints.insert(id, endpoint_tokens);
            keys[id.index()] = Some(key);
        }

        Self {
            tree,
            last_access: now,
            directories,
            endpoints,
        }
    }

    /// Resolve a token path, refreshing the access time on success.
    ///
    /// The path needs at least one directory token and one endpoint token:
    /// `/<dir>/<endpoint>`.
    pub fn resolve(&mut self, path: &str, now: Instant) -> RouteResult<RouteEndpoint> {
        let endpoint = self.lookup(path)?.clone();
        self.last_access = now;
        Ok(endpoint)
    }

    /// Resolve a token path without touching the access time.
    pub fn lookup(&self, path: &str) -> RouteResult<&RouteEndpoint> {
        let clean = path.strip_prefix('/').ok_or(RouteError::UnknownRoute)?;
        let (directory, token) = clean.rsplit_once('/').ok_or(RouteError::UnknownRoute)?;
        let key = format!("/{}", directory);

        let id = *self.directories.get(&key).ok_or(RouteError::UnknownRoute)?;
        let index = *self
            .endpoints
            .get(&id)
            .and_then(|tokens| tokens.get(token))
            .ok_or(RouteError::UnknownRoute)?;

        self.tree
            .container(id)
            .endpoints()
            .get(index)
            .ok_or(RouteError::UnknownRoute)
    }

    /// Every endpoint token path with its kind. Order carries no meaning.
    pub fn route_map(&self) -> Vec<RouteMapEntry> {
        let mut map = Vec::new();
        for (key, id) in &self.directories {
            let Some(tokens) = self.endpoints.get(id) else {
                tracing::error!(directory = %key, "Directory mapped without endpoint tokens");
                continue;
            };
            let container = self.tree.container(*id);
            for (token, index) in tokens {
                if let Some(endpoint) = container.endpoints().get(*index) {
                    map.push(RouteMapEntry {
                        kind: endpoint.kind,
                        route: format!("{}/{}", key, token),
                    });
                }
            }
        }
        map
    }

    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// Whether the session has been unused for at least `threshold` as of `now`.
    pub fn is_idle(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_access) >= threshold
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn endpoint_token_count(&self) -> usize {
        self.endpoints.values().map(HashMap::len).sum()
    }

    /// Endpoint tokens assigned within one container.
    pub fn endpoint_tokens(&self, container: ContainerId) -> Vec<&str> {
        self.endpoints
            .get(&container)
            .map(|tokens| tokens.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Draw tokens until `accept` takes one.
fn unique_token<T>(tokens: &mut impl TokenSource, mut accept: impl FnMut(String) -> Option<T>) -> T {
    loop {
        if let Some(value) = accept(tokens.next_token()) {
            return value;
        }
        tracing::warn!("Token collision within a session map, drawing again");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Handler;
    use axum::http::StatusCode;
    use std::collections::{HashSet, VecDeque};

    fn handler() -> Handler {
        Handler::new(|_req| async { StatusCode::OK })
    }

    fn sample_tree() -> Arc<RouteTree> {
        let mut tree = RouteTree::new();
        let root = tree.root();
        let api = tree.create_path(root, "api").unwrap();
        let public = tree.create_path(api, "public").unwrap();
        let admin = tree.create_path(api, "admin").unwrap();
        tree.add_endpoint(api, EndpointKind::ApiRoot, None, handler()).unwrap();
        tree.add_endpoint(public, EndpointKind::Public, None, handler()).unwrap();
        tree.add_endpoint(public, EndpointKind::Public, Some("version"), handler()).unwrap();
        tree.add_endpoint(admin, EndpointKind::Admin, Some("status"), handler()).unwrap();
        Arc::new(tree)
    }

    /// Replays a fixed list of tokens, then falls back to a counter.
    struct ScriptedTokens {
        script: VecDeque<&'static str>,
        counter: usize,
    }

    impl ScriptedTokens {
        fn new(script: &[&'static str]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                counter: 0,
            }
        }
    }

    impl TokenSource for ScriptedTokens {
        fn next_token(&mut self) -> String {
            match self.script.pop_front() {
                Some(token) => token.to_string(),
                None => {
                    self.counter += 1;
                    format!("t{}", self.counter)
                }
            }
        }
    }

    #[test]
    fn test_every_container_and_endpoint_mapped() {
        let tree = sample_tree();
        let session = Session::new(tree.clone(), Instant::now());

        assert_eq!(session.directory_count(), tree.container_count());
        assert_eq!(session.endpoint_token_count(), tree.endpoint_count());
        assert_eq!(session.route_map().len(), tree.endpoint_count());
    }

    #[test]
    fn test_route_map_round_trip() {
        let tree = sample_tree();
        let now = Instant::now();
        let mut session = Session::new(tree.clone(), now);

        let mut kinds = Vec::new();
        for entry in session.route_map() {
            let endpoint = session.resolve(&entry.route, now).unwrap();
            assert_eq!(endpoint.kind, entry.kind);
            kinds.push(endpoint.kind);
        }
        kinds.sort_by_key(|k| k.as_str());
        assert_eq!(
            kinds,
            vec![
                EndpointKind::Admin,
                EndpointKind::ApiRoot,
                EndpointKind::Public,
                EndpointKind::Public
            ]
        );
    }

    #[test]
    fn test_directory_keys_chain_from_root() {
        let tree = sample_tree();
        let mut tokens = ScriptedTokens::new(&["root", "api", "idx"]);
        let session = Session::with_tokens(tree, Instant::now(), &mut tokens);

        let api_root = session
            .route_map()
            .into_iter()
            .find(|e| e.kind == EndpointKind::ApiRoot)
            .unwrap();
        assert_eq!(api_root.route, "/root/api/idx");
    }

    #[test]
    fn test_colliding_draws_are_retried() {
        let mut tree = RouteTree::new();
        let root = tree.root();
        tree.add_endpoint(root, EndpointKind::Public, Some("a"), handler()).unwrap();
        tree.add_endpoint(root, EndpointKind::Public, Some("b"), handler()).unwrap();
        let tree = Arc::new(tree);

        let mut tokens = ScriptedTokens::new(&["dir", "same", "same", "other"]);
        let session = Session::with_tokens(tree.clone(), Instant::now(), &mut tokens);

        let mut assigned = session.endpoint_tokens(tree.root());
        assigned.sort();
        assert_eq!(assigned, vec!["other", "same"]);
    }

    #[test]
    fn test_tokens_distinct_within_container() {
        let mut tree = RouteTree::new();
        let root = tree.root();
        for i in 0..200 {
            let name = format!("endpoint-{}", i);
            tree.add_endpoint(root, EndpointKind::Public, Some(&name), handler()).unwrap();
        }
        let tree = Arc::new(tree);

        for _ in 0..20 {
            let session = Session::new(tree.clone(), Instant::now());
            let tokens = session.endpoint_tokens(tree.root());
            let unique: HashSet<_> = tokens.iter().collect();
            assert_eq!(unique.len(), 200);
        }
    }

    #[test]
    fn test_sessions_differ() {
        let tree = sample_tree();
        let a = Session::new(tree.clone(), Instant::now());
        let b = Session::new(tree, Instant::now());

        let routes_a: HashSet<_> = a.route_map().into_iter().map(|e| e.route).collect();
        let routes_b: HashSet<_> = b.route_map().into_iter().map(|e| e.route).collect();
        assert!(routes_a.is_disjoint(&routes_b));
    }

    #[test]
    fn test_malformed_paths_never_resolve() {
        let tree = sample_tree();
        let now = Instant::now();
        let mut session = Session::new(tree, now);
        let valid = session.route_map().remove(0).route;

        for path in ["", "/", "no-separator", "/single", "//", "/a/b/c", valid.trim_start_matches('/')] {
            assert_eq!(session.resolve(path, now).unwrap_err(), RouteError::UnknownRoute, "{:?}", path);
        }
        assert_eq!(
            session.resolve(&format!("{}/", valid), now).unwrap_err(),
            RouteError::UnknownRoute
        );
    }

    #[test]
    fn test_tampered_tokens_fail_uniformly() {
        let tree = sample_tree();
        let now = Instant::now();
        let mut session = Session::new(tree, now);
        let route = session.route_map().remove(0).route;
        let (dir, token) = route.rsplit_once('/').unwrap();

        let bad_endpoint = format!("{}/{}x", dir, token);
        let bad_directory = format!("{}x/{}", dir, token);
        assert_eq!(session.resolve(&bad_endpoint, now), Err(RouteError::UnknownRoute));
        assert_eq!(session.resolve(&bad_directory, now), Err(RouteError::UnknownRoute));
    }

    #[test]
    fn test_resolve_refreshes_last_access() {
        let tree = sample_tree();
        let start = Instant::now();
        let mut session = Session::new(tree, start);
        let route = session.route_map().remove(0).route;

        let later = start + Duration::from_secs(30);
        assert!(session.resolve("/nope/nope", later).is_err());
        assert_eq!(session.last_access(), start);

        session.resolve(&route, later).unwrap();
        assert_eq!(session.last_access(), later);
    }

    #[test]
    fn test_idle_threshold() {
        let tree = sample_tree();
        let start = Instant::now();
        let session = Session::new(tree, start);
        let threshold = Duration::from_secs(600);
        let epsilon = Duration::from_millis(1);

        assert!(!session.is_idle(start + threshold - epsilon, threshold));
        assert!(session.is_idle(start + threshold + epsilon, threshold));
        assert!(!session.is_idle(start, threshold));
    }

    #[test]
    fn test_empty_tree_has_no_routes() {
        let tree = Arc::new(RouteTree::new());
        let mut session = Session::new(tree, Instant::now());
        assert_eq!(session.directory_count(), 1);
        assert!(session.route_map().is_empty());
        assert!(session.resolve("/a/b", Instant::now()).is_err());
    }
}
