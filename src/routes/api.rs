//! `/api` container.

use axum::{http::StatusCode, Json};
use serde_json::json;

use crate::routing::{ContainerId, EndpointKind, Handler, RouteResult, RouteTree};

pub fn register(tree: &mut RouteTree, container: ContainerId) -> RouteResult<()> {
    tree.add_endpoint(
        container,
        EndpointKind::ApiRoot,
        None,
        Handler::new(|_req| async { (StatusCode::OK, Json(json!({ "success": true }))) }),
    )
}
