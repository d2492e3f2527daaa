//! Edge router - runs the middleware chain ahead of the platform default
//!
//! Every request except the platform health check goes through the
//! middleware registry. When no middleware answers, the platform default
//! (404 Not Found) is returned.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use edge_middleware_sdk::TraceContext;

use crate::runtime::RequestId;
use crate::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the edge router that handles all incoming requests
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .fallback(handle_edge_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint, reports the database actor's state
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(db) = state.services.db.as_ref() else {
        return (StatusCode::OK, "OK");
    };

    match db.health().await {
        Ok(true) => (StatusCode::OK, "OK"),
        Ok(false) => (StatusCode::SERVICE_UNAVAILABLE, "Database unhealthy"),
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}

/// Handle an incoming request through the middleware chain
async fn handle_edge_request(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(|id| RequestId::from_string(id.to_string()))
        .unwrap_or_default();

    let query: HashMap<String, String> = request
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    // Headers that are not valid UTF-8 are dropped rather than passed on empty.
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect();

    // An unreadable or oversized body is dropped; routing never depends on it.
    let body = match axum::body::to_bytes(request.into_body(), state.config.max_body_size).await {
        Ok(b) if b.is_empty() => None,
        Ok(b) => Some(String::from_utf8_lossy(&b).to_string()),
        Err(e) => {
            tracing::warn!(request_id = %request_id, "Dropping request body: {}", e);
            None
        }
    };

    let sdk_request = edge_middleware_sdk::Request {
        method,
        path,
        query,
        headers,
        body,
        request_id: request_id.to_string(),
    };

    let trace = TraceContext::from_header(sdk_request.traceparent());
    let ctx = state.create_context(request_id.clone(), trace);

    tracing::debug!(
        request_id = %request_id,
        method = %sdk_request.method,
        path = %sdk_request.path,
        traceparent = %ctx.trace,
        "Incoming request"
    );
    if ctx.is_debug() {
        tracing::debug!(request_id = %request_id, headers = ?sdk_request.headers, "Request headers");
    }

    match state.middleware.execute_with_timeout(&ctx, sdk_request, ctx.timeout()).await {
        Ok(Some(sdk_response)) => into_http_response(sdk_response),
        Ok(None) => platform_default(),
        Err(e) => {
            tracing::error!(request_id = %request_id, "Middleware error: {}", e);
            into_http_response(e.to_response())
        }
    }
}

/// What the platform answers when no middleware produced a response
fn platform_default() -> Response {
    into_http_response(edge_middleware_sdk::Response::not_found())
}

fn into_http_response(sdk_response: edge_middleware_sdk::Response) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(sdk_response.status).unwrap_or(StatusCode::OK));

    for (key, value) in &sdk_response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    match builder.body(Body::from(sdk_response.body.unwrap_or_default())) {
        Ok(response) => response,
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build response").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::runtime::services::{Database, DatabaseConfig, Services};
    use crate::runtime::MiddlewareRegistry;
    use crate::users::{self, RootUsers};
    use serde_json::json;
    use tower::ServiceExt;

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            db_type: "sqlite".to_string(),
            database_url: ":memory:".to_string(),
            handler_timeout_secs: 5,
            max_body_size: 1024,
            migrate: true,
            debug: false,
        }
    }

    async fn app(seed: &[&str]) -> Router {
        let config = test_config();
        let db = Database::start(DatabaseConfig::sqlite(config.database_url.clone())).await.unwrap();
        users::migrate(&db).await.unwrap();
        for email in seed {
            db.execute("INSERT INTO users (email) VALUES (?)", &[json!(email)]).await.unwrap();
        }

        let state = AppState::new(
            config,
            Services::new().with_db(db),
            MiddlewareRegistry::new().with(RootUsers),
        );
        create_router(Arc::new(state))
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_with_empty_collection() {
        let (status, content_type, body) = send(app(&[]).await, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json;charset=UTF-8"));
        assert_eq!(body, r#"{"data":[null,[]]}"#);
    }

    #[tokio::test]
    async fn test_root_envelope_shape() {
        let (status, _, body) = send(app(&["a@example.com", "b@example.com"]).await, "/?cache=no").await;
        assert_eq!(status, StatusCode::OK);

        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);

        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["email"], "a@example.com");
        assert_eq!(data[1].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_body_still_answers_root() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(vec![b'x'; 4096]))
            .unwrap();
        let response = app(&[]).await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"data":[null,[]]}"#);
    }

    #[tokio::test]
    async fn test_other_path_falls_through_to_platform_default() {
        let (status, content_type, body) = send(app(&[]).await, "/other").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_ne!(content_type.as_deref(), Some("application/json;charset=UTF-8"));
        assert_eq!(body, "Not Found");
    }

    #[tokio::test]
    async fn test_database_error_becomes_500() {
        let db = Database::start(DatabaseConfig::sqlite(":memory:")).await.unwrap();
        let state = AppState::new(
            test_config(),
            Services::new().with_db(db),
            MiddlewareRegistry::new().with(RootUsers),
        );

        let (status, _, body) = send(create_router(Arc::new(state)), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("no such table"));
    }

    struct RecordTrace(Arc<std::sync::Mutex<Vec<TraceContext>>>);

    impl edge_middleware_sdk::Middleware<crate::runtime::Context> for RecordTrace {
        fn name(&self) -> &str {
            "record-trace"
        }

        fn call<'a>(
            &'a self,
            ctx: &'a crate::runtime::Context,
            _req: edge_middleware_sdk::Request,
        ) -> edge_middleware_sdk::BoxFuture<'a, edge_middleware_sdk::MiddlewareResult> {
            Box::pin(async move {
                self.0.lock().unwrap().push(ctx.trace.clone());
                Ok(None)
            })
        }
    }

    #[tokio::test]
    async fn test_trace_context_from_traceparent_header() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let state = Arc::new(AppState::new(
            test_config(),
            Services::new(),
            MiddlewareRegistry::new().with(RecordTrace(seen.clone())),
        ));

        for header in [
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
            Some("undefined"),
            None,
        ] {
            let mut request = Request::builder().uri("/");
            if let Some(header) = header {
                request = request.header("traceparent", header);
            }
            let response = create_router(state.clone())
                .oneshot(request.body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].trace_id(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_ne!(seen[0].span_id(), "00f067aa0ba902b7");
        for trace in seen.iter() {
            let header = trace.traceparent();
            assert!(!header.contains("undefined"));
            assert_eq!(TraceContext::parse(&header).as_ref(), Some(trace));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = send(app(&[]).await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
