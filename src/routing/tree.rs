//! Static route namespace.
//!
//! # Responsibilities
//! - Hold the container hierarchy and the endpoints each container owns
//! - Enforce segment naming rules and sibling uniqueness at registration
//! - Case-insensitive lookup of children and endpoints
//! - Derive full paths for diagnostics
//!
//! # Design Decisions
//! - Containers live in an arena indexed by `ContainerId`; the root is slot 0
//! - Built single-threaded at startup, then frozen behind an `Arc`
//! - Full paths are never used for dispatch, only for logs and the console

use crate::routing::endpoint::{EndpointKind, Handler, RouteEndpoint};
use crate::routing::error::{RouteError, RouteResult};

/// Index of a container inside the `RouteTree` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

impl ContainerId {
    pub const ROOT: ContainerId = ContainerId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// A node in the namespace: one path segment plus its endpoints and children.
#[derive(Debug)]
pub struct RouteContainer {
    segment: String,
    parent: Option<ContainerId>,
    children: Vec<ContainerId>,
    endpoints: Vec<RouteEndpoint>,
}

impl RouteContainer {
    fn new(segment: String, parent: Option<ContainerId>) -> Self {
        Self {
            segment,
            parent,
            children: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// Path segment as registered; empty only for the root.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn parent(&self) -> Option<ContainerId> {
        self.parent
    }

    pub fn children(&self) -> &[ContainerId] {
        &self.children
    }

    pub fn endpoints(&self) -> &[RouteEndpoint] {
        &self.endpoints
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Hierarchical namespace of containers and endpoints.
#[derive(Debug)]
pub struct RouteTree {
    containers: Vec<RouteContainer>,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTree {
    /// Create a tree holding only the root container.
    pub fn new() -> Self {
        Self {
            containers: vec![RouteContainer::new(String::new(), None)],
        }
    }

    pub fn root(&self) -> ContainerId {
        ContainerId::ROOT
    }

    /// Borrow a container.
    ///
    /// Ids are only meaningful for the tree that returned them; passing an id
    /// from another tree is a programming error and panics when out of range.
    pub fn container(&self, id: ContainerId) -> &RouteContainer {
        &self.containers[id.0]
    }

    /// Number of containers, root included.
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn endpoint_count(&self) -> usize {
        self.containers.iter().map(|c| c.endpoints.len()).sum()
    }

    /// Return the child named `segment` (case-insensitive), creating it if absent.
    pub fn create_path(&mut self, parent: ContainerId, segment: &str) -> RouteResult<ContainerId> {
        validate_segment(segment)?;

        if let Some(existing) = self.get_child(parent, segment) {
            return Ok(existing);
        }

        let id = ContainerId(self.containers.len());
        self.containers
            .push(RouteContainer::new(segment.to_string(), Some(parent)));
        self.containers[parent.0].children.push(id);

        tracing::debug!(path = %self.full_path(id), "Route container created");
        Ok(id)
    }

    /// Create every container along a `/`-separated path such as `api/public`.
    pub fn create_paths(&mut self, parent: ContainerId, path: &str) -> RouteResult<ContainerId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek().is_none() {
            return Err(RouteError::InvalidSegment(path.to_string()));
        }

        let mut current = parent;
        for segment in segments {
            current = self.create_path(current, segment)?;
        }
        Ok(current)
    }

    /// Register an endpoint under `container`.
    ///
    /// `None`, `""` and `"/"` all register the container's index endpoint.
    pub fn add_endpoint(
        &mut self,
        container: ContainerId,
        kind: EndpointKind,
        name: Option<&str>,
        handler: Handler,
    ) -> RouteResult<()> {
        let name = match name {
            None | Some("") | Some("/") => "",
            Some(name) => {
                validate_segment(name)?;
                name
            }
        };

        if self.get_endpoint(container, Some(name)).is_some() {
            return Err(RouteError::DuplicateEndpoint {
                container: self.full_path(container),
                name: name.to_string(),
            });
        }

        let endpoint = RouteEndpoint {
            name: name.to_string(),
            kind,
            handler,
        };
        tracing::info!(kind = %kind, "Registered path: {}", self.endpoint_path(container, &endpoint));
        self.containers[container.0].endpoints.push(endpoint);
        Ok(())
    }

    /// Case-insensitive child lookup.
    pub fn get_child(&self, container: ContainerId, segment: &str) -> Option<ContainerId> {
        self.containers[container.0]
            .children
            .iter()
            .copied()
            .find(|child| self.containers[child.0].segment.eq_ignore_ascii_case(segment))
    }

    /// Case-insensitive endpoint lookup; `None` or `""` looks up the index endpoint.
    pub fn get_endpoint(&self, container: ContainerId, name: Option<&str>) -> Option<&RouteEndpoint> {
        self.containers[container.0]
            .endpoints
            .iter()
            .find(|endpoint| endpoint.matches_name(name))
    }

    /// Segment chain from the root to `id`, root excluded, e.g. `/api/public`.
    pub fn full_path(&self, id: ContainerId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let container = &self.containers[node.0];
            if !container.is_root() {
                segments.push(container.segment.as_str());
            }
            current = container.parent;
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Full path of an endpoint; index endpoints share their container's path.
    pub fn endpoint_path(&self, container: ContainerId, endpoint: &RouteEndpoint) -> String {
        let base = self.full_path(container);
        if endpoint.is_index() {
            base
        } else if base == "/" {
            format!("/{}", endpoint.name)
        } else {
            format!("{}/{}", base, endpoint.name)
        }
    }

    /// All containers, parents before children.
    pub fn depth_first(&self) -> Vec<ContainerId> {
        let mut order = Vec::with_capacity(self.containers.len());
        let mut stack = vec![ContainerId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.containers[id.0].children.iter().rev().copied());
        }
        order
    }

    /// `(full path, kind)` of every endpoint, in depth-first order.
    pub fn describe(&self) -> Vec<(String, EndpointKind)> {
        self.depth_first()
            .into_iter()
            .flat_map(|id| {
                self.containers[id.0]
                    .endpoints
                    .iter()
                    .map(move |endpoint| (self.endpoint_path(id, endpoint), endpoint.kind))
            })
            .collect()
    }
}

/// Segments must be non-empty and limited to ASCII letters, digits and `-`.
/// Letters are accepted in either case since lookups ignore case.
pub fn validate_segment(segment: &str) -> RouteResult<()> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RouteError::InvalidSegment(segment.to_string()))
    }
}
