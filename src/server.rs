//! HTTP shell: JSON framing, request ids, and status mapping around the dispatcher.
//!
//! Routes:
//! - `POST /method` -- envelope dispatch
//! - anything else -- 404 envelope
//!
//! Middleware (outermost to innermost): `SetRequestId` (simple-form UUID v4
//! when the client sent none), `Trace`, `Timeout`, `PropagateRequestId`.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::HeaderName;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::dispatch::{method_handler, CallContext, Response};
use crate::error::ApiError;
use crate::store::Store;
use crate::types::Status;

const REQUEST_ID: &str = "x-request-id";

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

/// Assembles the router with all routes and middleware.
pub fn build_router(store: Arc<dyn Store>, config: &ServerConfig) -> Router {
    let x_request_id = HeaderName::from_static(REQUEST_ID);

    Router::new()
        .route("/method", post(method_route))
        .fallback(not_found)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(x_request_id, MakeSimpleUuid))
        .with_state(AppState { store })
}

/// Binds the configured address and serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server hits a
/// fatal I/O error.
pub async fn serve(
    config: ServerConfig,
    store: Arc<dyn Store>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.addr()).await?;
    info!("Starting server at {}", listener.local_addr()?);

    axum::serve(listener, build_router(store, &config))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn method_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let request_id = request_id(&headers);

    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(err) => {
            warn!(request_id = %request_id, "{}", err);
            return reply(&Response::from(err));
        }
    };

    let mut ctx = CallContext::new(request_id.clone());
    let store = Arc::clone(&state.store);
    // A panic in the core surfaces as a JoinError, not a dropped connection.
    let handled = tokio::task::spawn_blocking(move || {
        let response = method_handler(&body, &mut ctx, store.as_ref());
        (response, ctx)
    })
    .await;

    let response = match handled {
        Ok((response, ctx)) => {
            info!(
                request_id = %ctx.request_id,
                code = response.status.code(),
                has = ?ctx.has,
                nclients = ?ctx.nclients,
                "request handled"
            );
            response
        }
        Err(err) => {
            error!(request_id = %request_id, "Unexpected error: {}", err);
            Response::from(ApiError::internal(err.to_string()))
        }
    };
    reply(&response)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    warn!("No route for {}", uri.path());
    reply(&Response::error(Status::NotFound, ""))
}

/// Issues UUID v4 request ids in simple (unhyphenated) form.
#[derive(Debug, Clone, Copy, Default)]
struct MakeSimpleUuid;

impl MakeRequestId for MakeSimpleUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&new_request_id())
            .ok()
            .map(RequestId::new)
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Request id set by the middleware, or a fresh one when called outside it.
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(new_request_id)
}

/// Parses the raw body as a JSON object.
fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::BadRequest {
            message: format!(
                "request body must be a JSON object, got {}",
                crate::types::json_type_name(&other)
            ),
        }),
        Err(e) => Err(ApiError::BadRequest {
            message: format!("invalid JSON: {}", e),
        }),
    }
}

fn reply(response: &Response) -> (StatusCode, Json<Value>) {
    let status =
        StatusCode::from_u16(response.status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.envelope()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use serde_json::json;
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(Arc::new(MemoryStore::new()), &ServerConfig::default())
    }

    async fn post_json(uri: &str, body: impl Into<Body>) -> (StatusCode, HeaderMap, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, _, body) = post_json("/method", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Bad Request", "code": 400}));
    }

    #[tokio::test]
    async fn non_object_body_is_bad_request() {
        let (status, _, _) = post_json("/method", "[1, 2]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _, body) = post_json("/score", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not Found", "code": 404}));
    }

    #[tokio::test]
    async fn empty_envelope_is_invalid_request() {
        let (status, headers, body) = post_json("/method", "{}").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 422);
        assert!(body["error"].as_str().unwrap().contains("login"));
        assert!(headers.contains_key(REQUEST_ID));
    }

    #[tokio::test]
    async fn generated_request_id_is_simple_uuid() {
        let (_, headers, _) = post_json("/method", "{}").await;
        let id = headers[REQUEST_ID].to_str().unwrap();
        assert_eq!(id.len(), 32, "{}", id);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()), "{}", id);
    }

    #[tokio::test]
    async fn client_request_id_is_echoed() {
        let request = Request::builder()
            .method("POST")
            .uri("/method")
            .header(REQUEST_ID, "req-7")
            .body(Body::from("{}"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID], "req-7");
    }

    #[tokio::test]
    async fn valid_call_wraps_response() {
        let token = Principal::new("horns&hoofs", "h&f").expected_token(Utc::now());
        let envelope = json!({
            "account": "horns&hoofs",
            "login": "h&f",
            "token": token,
            "method": "online_score",
            "arguments": {"first_name": "a", "last_name": "b"}
        });
        let (status, _, body) = post_json("/method", envelope.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["response"]["score"], json!(0.5));
    }

    #[test]
    fn request_id_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, "abc".parse().unwrap());
        assert_eq!(request_id(&headers), "abc");

        let generated = request_id(&HeaderMap::new());
        assert_eq!(generated.len(), 32);
    }
}
