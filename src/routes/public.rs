//! `/api/public` container.

use axum::Json;
use serde::Serialize;

use crate::routing::{ContainerId, EndpointKind, Handler, RouteResult, RouteTree};

#[derive(Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
}

pub fn register(tree: &mut RouteTree, container: ContainerId) -> RouteResult<()> {
    tree.add_endpoint(
        container,
        EndpointKind::Public,
        None,
        Handler::new(|_req| async { Json(serde_json::json!({ "success": true })) }),
    )?;

    tree.add_endpoint(
        container,
        EndpointKind::Public,
        Some("version"),
        Handler::new(|_req| async {
            Json(VersionInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            })
        }),
    )
}
