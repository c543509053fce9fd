//! The gateway's static namespace.
//!
//! Each module registers the endpoints of one container. The tree is built
//! once by [`build_namespace`] before the server starts and never changes
//! afterwards.
//!
//! ```text
//! /api            API_ROOT (index)
//! /api/public     PUBLIC (index), PUBLIC version
//! /api/admin      ADMIN status
//! ```

pub mod admin;
pub mod api;
pub mod public;

use crate::routing::{RouteResult, RouteTree};

/// Register every container and endpoint served by the gateway.
pub fn build_namespace() -> RouteResult<RouteTree> {
    let mut tree = RouteTree::new();
    let root = tree.root();

    let api = tree.create_path(root, "api")?;
    api::register(&mut tree, api)?;

    let public = tree.create_path(api, "public")?;
    public::register(&mut tree, public)?;

    let admin = tree.create_path(api, "admin")?;
    admin::register(&mut tree, admin)?;

    Ok(tree)
}
