//! `/api/admin` container.

use axum::Json;
use serde::Serialize;

use crate::routing::{ContainerId, EndpointKind, Handler, RouteResult, RouteTree};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub fn register(tree: &mut RouteTree, container: ContainerId) -> RouteResult<()> {
    tree.add_endpoint(
        container,
        EndpointKind::Admin,
        Some("status"),
        Handler::new(|_req| async {
            Json(SystemStatus {
                version: env!("CARGO_PKG_VERSION"),
                status: "operational",
            })
        }),
    )
}
