use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use ethgate_core::chain::ChainState;
use ethgate_core::config::ConfigHandle;
use ethgate_core::errors::GatewayError;
use ethgate_core::request::Request;

/// Everything a request handler needs: the current-config handle and the
/// shared chain head.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigHandle,
    pub chain: Arc<ChainState>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new().route("/", post(handle_rpc)).with_state(state)
}

/// The single JSON-RPC endpoint.
///
/// Snapshots the running config once, decodes and validates the body,
/// classifies it against the chain head and hands it to the snapshot's
/// strategy. Success responses are the upstream bytes verbatim.
async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let snapshot = state.config.current();

    let mut request = match Request::decode(body, &snapshot) {
        Ok(request) => request,
        Err(error) => return error_response(&error, Value::Null),
    };
    request.classify_archive(state.chain.head());

    match snapshot.strategy().handle(&request).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(error) => {
            tracing::warn!(method = request.method(), %error, "request failed");
            error_response(&error, request.id().clone())
        }
    }
}

/// Maps the core's opaque error reasons to HTTP statuses and JSON-RPC
/// error codes. The core never decides wire codes itself.
fn error_response(error: &GatewayError, id: Value) -> Response {
    let (status, code) = match error {
        GatewayError::Decode | GatewayError::BatchUnsupported => {
            (StatusCode::BAD_REQUEST, -32600)
        }
        GatewayError::DeniedMethod => (StatusCode::FORBIDDEN, -32601),
        GatewayError::DeniedContract => (StatusCode::FORBIDDEN, -32000),
        GatewayError::Timeout
        | GatewayError::AllUpstreamsFailed
        | GatewayError::NoHealthyUpstream
        | GatewayError::Upstream(_) => (StatusCode::BAD_GATEWAY, -32000),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, -32603),
    };

    let body = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": error.to_string() },
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    use ethgate_core::config::{ConfigController, ConfigSource};
    use ethgate_core::errors::ConfigError;
    use ethgate_core::upstream::HttpClient;

    struct StaticSource(&'static str);

    impl ConfigSource for StaticSource {
        fn load(&self) -> Result<String, ConfigError> {
            Ok(self.0.to_string())
        }
    }

    fn app() -> Router {
        let source = StaticSource(
            r#"{
                "upstreams": ["http://127.0.0.1:1"],
                "strategy": "NAIVE",
                "methodLimitationEnabled": true,
                "allowedMethods": ["eth_blockNumber"]
            }"#,
        );
        let (_, config) =
            ConfigController::bootstrap(Box::new(source), HttpClient::new().unwrap()).unwrap();
        build_router(AppState {
            config,
            chain: Arc::new(ChainState::new()),
        })
    }

    async fn post_body(app: Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn batch_bodies_get_a_bad_request() {
        let (status, body) = post_body(app(), r#"[{"id":1,"method":"eth_blockNumber"}]"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!(-32600));
    }

    #[tokio::test]
    async fn denied_methods_get_forbidden() {
        let (status, body) =
            post_body(app(), r#"{"id":1,"method":"eth_getLogs","params":[]}"#).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn malformed_json_gets_a_bad_request() {
        let (status, body) = post_body(app(), "{oops").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], json!(-32600));
    }
}
