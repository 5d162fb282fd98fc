use std::future::Future;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::{Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use eventtail_types::{ClearReport, EventBatch, HealthReport};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the HTTP router over the given state
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // Known paths answer other methods with a JSON 405
    Router::new()
        .route("/events", get(events).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/clear", get(clear).fallback(method_not_allowed))
        .route("/", get(viewer).fallback(method_not_allowed))
        .route("/index.html", get(viewer).fallback(method_not_allowed))
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(preflight_no_content))
}

/// Serve the router on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Answer every OPTIONS request with 204, keeping the CORS headers
async fn preflight_no_content(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;
    if is_options {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    offset: Option<String>,
}

async fn events(
    State(state): State<AppState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventBatch>, ApiError> {
    let Query(query) = query?;
    let offset = parse_offset(query.offset.as_deref())?;
    let batch = state.log().read_since(offset).await?;
    Ok(Json(batch))
}

/// Missing or empty means "from the start"
fn parse_offset(raw: Option<&str>) -> Result<u64, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0),
        Some(s) => s
            .parse::<u64>()
            .map_err(|_| ApiError::InvalidOffset(s.to_string())),
    }
}

async fn health() -> Json<HealthReport> {
    Json(HealthReport::now())
}

async fn clear(State(state): State<AppState>) -> Result<Json<ClearReport>, ApiError> {
    state.log().clear().await?;
    Ok(Json(ClearReport::cleared()))
}

async fn viewer(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(state.viewer_path()).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            tracing::debug!(path = %state.viewer_path().display(), error = %err, "viewer unavailable");
            (StatusCode::NOT_FOUND, "Visualizer not found").into_response()
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::http::HeaderMap;
    use eventtail_log::EventLog;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Fixture {
        dir: TempDir,
        app: Router,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let log = EventLog::new(dir.path().join("events.jsonl"));
            let state = AppState::new(log, dir.path().join("viewer.html"));
            Self {
                app: router(state),
                dir,
            }
        }

        fn log_path(&self) -> std::path::PathBuf {
            self.dir.path().join("events.jsonl")
        }

        fn append(&self, text: &str) {
            append(&self.log_path(), text);
        }

        async fn request(&self, method: Method, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            (status, headers, body)
        }

        async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
            let (status, _, body) = self.request(Method::GET, uri).await;
            (status, serde_json::from_slice(&body).unwrap())
        }
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_events_concrete_scenario() {
        let fx = Fixture::new();
        fx.append("{\"a\":1}\n{\"a\":2}\ngarbage\n");

        let (status, body) = fx.get_json("/events?offset=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"events": [{"a": 1}, {"a": 2}], "offset": 24}));
    }

    #[tokio::test]
    async fn test_events_absent_log() {
        let fx = Fixture::new();
        let (status, body) = fx.get_json("/events?offset=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"events": [], "offset": 0}));
    }

    #[tokio::test]
    async fn test_events_default_offset_is_zero() {
        let fx = Fixture::new();
        fx.append("{\"a\":1}\n");

        let (_, body) = fx.get_json("/events").await;
        assert_eq!(body, json!({"events": [{"a": 1}], "offset": 8}));

        let (_, body) = fx.get_json("/events?offset=").await;
        assert_eq!(body, json!({"events": [{"a": 1}], "offset": 8}));
    }

    #[tokio::test]
    async fn test_events_offset_past_end() {
        let fx = Fixture::new();
        fx.append("{\"a\":1}\n");

        for offset in [8, 9, 1_000_000] {
            let (_, body) = fx.get_json(&format!("/events?offset={offset}")).await;
            assert_eq!(body, json!({"events": [], "offset": 8}));
        }
    }

    #[tokio::test]
    async fn test_events_invalid_offset() {
        let fx = Fixture::new();
        for bad in ["abc", "-1", "1.5"] {
            let (status, body) = fx.get_json(&format!("/events?offset={bad}")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], json!(format!("invalid offset: {bad}")));
        }
    }

    #[tokio::test]
    async fn test_events_duplicate_offset_is_json_error() {
        let fx = Fixture::new();
        let (status, headers, body) = fx.request(Method::GET, "/events?offset=1&offset=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("invalid query: "));
    }

    #[tokio::test]
    async fn test_events_idempotent_and_monotonic() {
        let fx = Fixture::new();
        fx.append("{\"n\":1}\n{\"n\":2}\n");

        let (_, first) = fx.get_json("/events?offset=0").await;
        let (_, again) = fx.get_json("/events?offset=0").await;
        assert_eq!(first, again);

        fx.append("{\"n\":3}\n");
        let next = first["offset"].as_u64().unwrap();
        let (_, second) = fx.get_json(&format!("/events?offset={next}")).await;
        assert_eq!(second, json!({"events": [{"n": 3}], "offset": 24}));
    }

    #[tokio::test]
    async fn test_clear_then_read() {
        let fx = Fixture::new();
        fx.append("{\"a\":1}\n");

        let (status, body) = fx.get_json("/clear").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "cleared"}));

        let (_, body) = fx.get_json("/events?offset=0").await;
        assert_eq!(body, json!({"events": [], "offset": 0}));

        // Idempotent
        let (status, _) = fx.get_json("/clear").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clear_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be truncated as a file
        let log = EventLog::new(dir.path());
        let app = router(AppState::new(log, dir.path().join("viewer.html")));

        let request = Request::builder().uri("/clear").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("truncate"));
    }

    #[tokio::test]
    async fn test_events_read_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        // Give the directory a non-zero size so the read is attempted
        std::fs::write(dir.path().join("viewer.html"), "<h1>events</h1>").unwrap();
        let log = EventLog::new(dir.path());
        let app = router(AppState::new(log, dir.path().join("viewer.html")));

        let request = Request::builder()
            .uri("/events?offset=0")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("failed to "));
    }

    #[tokio::test]
    async fn test_health_always_ok() {
        let fx = Fixture::new();
        let (status, body) = fx.get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_viewer_served_when_present() {
        let fx = Fixture::new();
        std::fs::write(fx.dir.path().join("viewer.html"), "<h1>events</h1>").unwrap();

        for uri in ["/", "/index.html"] {
            let (status, headers, body) = fx.request(Method::GET, uri).await;
            assert_eq!(status, StatusCode::OK);
            assert!(
                headers[header::CONTENT_TYPE]
                    .to_str()
                    .unwrap()
                    .starts_with("text/html")
            );
            assert_eq!(&body[..], b"<h1>events</h1>");
        }
    }

    #[tokio::test]
    async fn test_viewer_missing() {
        let fx = Fixture::new();
        let (status, _, body) = fx.request(Method::GET, "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(&body[..], b"Visualizer not found");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let fx = Fixture::new();
        let (status, body) = fx.get_json("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));

        let (status, _, _) = fx.request(Method::POST, "/also/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_on_known_route() {
        let fx = Fixture::new();
        for (method, uri) in [
            (Method::POST, "/events"),
            (Method::POST, "/health"),
            (Method::DELETE, "/clear"),
            (Method::PUT, "/"),
        ] {
            let (status, headers, body) = fx.request(method, uri).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert!(
                headers[header::CONTENT_TYPE]
                    .to_str()
                    .unwrap()
                    .starts_with("application/json")
            );
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body, json!({"error": "Method not allowed"}));
        }
    }

    #[tokio::test]
    async fn test_cors_headers_on_responses() {
        let fx = Fixture::new();
        let (_, headers, _) = fx.request(Method::GET, "/health").await;
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_options_preflight_is_no_content() {
        let fx = Fixture::new();
        let (status, headers, body) = fx.request(Method::OPTIONS, "/events").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("GET"));
        assert!(methods.contains("OPTIONS"));

        let (status, _, _) = fx.request(Method::OPTIONS, "/anything").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset(None).unwrap(), 0);
        assert_eq!(parse_offset(Some("")).unwrap(), 0);
        assert_eq!(parse_offset(Some("42")).unwrap(), 42);
        assert!(matches!(
            parse_offset(Some("x")),
            Err(ApiError::InvalidOffset(_))
        ));
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let dir = TempDir::new().unwrap();
        let state = AppState::new(
            EventLog::new(dir.path().join("events.jsonl")),
            dir.path().join("viewer.html"),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(listener, state, async move {
            let _ = stop_rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"));
        assert!(raw.contains("\"status\":\"ok\""));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
