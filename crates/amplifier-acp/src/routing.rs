//! Namespace switch and axum `Router` wiring (§2.11 / §4.2). Grounded on
//! `original_source/app.py`'s `create_app` for the ACP-enabled/disabled
//! route layout, and on `ah-rest-server/src/server.rs`'s `build_app` for the
//! `ServiceBuilder` middleware stack.

use crate::jsonrpc::RpcHandler;
use crate::transport::{http, ws, NotificationHub};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub handler: Arc<dyn RpcHandler>,
    pub notifications: Arc<NotificationHub>,
    pub idle_timeout: Duration,
}

/// Build the full app router. When `acp_enabled`, ACP's `/acp/*` routes
/// mount at root and amplifier's own routes move under `/amplifier/`; when
/// disabled, the reverse holds and `/acp/*` is entirely absent. `/health`
/// (root) and `/amplifier/health` (namespaced) are shared regardless, per
/// the "CORS and health endpoints beyond minimal" non-goal carrying the
/// minimal health check forward as ambient stack.
pub fn build_app(state: AppState, acp_enabled: bool) -> Router {
    let http_state = http::HttpState { handler: state.handler.clone(), notifications: state.notifications.clone() };
    let ws_state = ws::WsState { handler: state.handler.clone(), notifications: state.notifications.clone(), idle_timeout: state.idle_timeout };

    let app = if acp_enabled {
        let amplifier_routes = Router::new().route("/health", get(http::health));
        Router::new()
            .merge(http::router(http_state))
            .merge(ws::router(ws_state))
            .route("/health", get(http::health))
            .nest("/amplifier", amplifier_routes)
    } else {
        Router::new().route("/health", get(http::health))
    };

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcpError;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    struct NoopHandler;

    #[async_trait]
    impl RpcHandler for NoopHandler {
        async fn handle(&self, _method: &str, _params: Option<Value>) -> Result<Value, AcpError> {
            Ok(Value::Null)
        }
    }

    fn state() -> AppState {
        AppState { handler: Arc::new(NoopHandler), notifications: Arc::new(NotificationHub::new()), idle_timeout: Duration::from_secs(300) }
    }

    #[tokio::test]
    async fn acp_enabled_mounts_amplifier_health_under_namespace() {
        let app = build_app(state(), true);
        let response = app.oneshot(Request::builder().uri("/amplifier/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn acp_enabled_exposes_acp_rpc_at_root() {
        let app = build_app(state(), true);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/acp/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"jsonrpc":"2.0","method":"noop"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn acp_disabled_has_no_acp_routes() {
        let app = build_app(state(), false);
        let response = app.oneshot(Request::builder().uri("/acp/rpc").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn acp_disabled_mounts_amplifier_health_at_root() {
        let app = build_app(state(), false);
        let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
