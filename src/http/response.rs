//! Response shapes for handshake and rejection outcomes.
//!
//! # Design Decisions
//! - Unknown routes get an empty body (and 200 for HEAD) so scanners learn nothing
//! - Setup-required is distinct so real clients know to handshake again

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::routing::RouteError;
use crate::session::{Handshake, RouteMapEntry};

/// Body of a handshake that issued a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMapResponse {
    pub routes: Vec<RouteMapEntry>,
}

/// Body of a setup-required rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRequiredBody {
    pub code: String,
}

pub fn handshake_response(handshake: Handshake) -> Response {
    match handshake {
        Handshake::Issued(routes) => (StatusCode::OK, Json(RouteMapResponse { routes })).into_response(),
        Handshake::Acknowledged => StatusCode::OK.into_response(),
    }
}

pub fn rejection_response(error: &RouteError, method: &Method) -> Response {
    let status = error.status_for(method);
    match error {
        RouteError::SetupRequired => (
            status,
            Json(SetupRequiredBody {
                code: "Setup required".to_string(),
            }),
        )
            .into_response(),
        _ => status.into_response(),
    }
}

/// Uniform 404 with no body.
pub fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

/// Uniform 400 with no body.
pub fn bad_request() -> Response {
    StatusCode::BAD_REQUEST.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::EndpointKind;

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_issued_handshake_body() {
        let response = handshake_response(Handshake::Issued(vec![RouteMapEntry {
            kind: EndpointKind::ApiRoot,
            route: "/a/b".into(),
        }]));
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "routes": [{ "kind": "API_ROOT", "route": "/a/b" }] })
        );
    }

    #[tokio::test]
    async fn test_acknowledged_handshake_is_empty() {
        let response = handshake_response(Handshake::Acknowledged);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_rejections() {
        let response = rejection_response(&RouteError::UnknownRoute, &Method::GET);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());

        let response = rejection_response(&RouteError::UnknownRoute, &Method::HEAD);
        assert_eq!(response.status(), StatusCode::OK);

        let response = rejection_response(&RouteError::SetupRequired, &Method::GET);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: SetupRequiredBody = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body.code, "Setup required");
    }
}
