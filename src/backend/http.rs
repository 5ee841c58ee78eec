//! reqwest client for the demo API backend.
//!
//! Every call sends and accepts JSON. Failures are classified into
//! [`ApiError`] so the screens can show one message and decide whether a
//! retry makes sense.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{ApiError, Backend, EchoReply, PlotImage, TodoItem};

/// User agent for API requests
const USER_AGENT: &str = concat!("Plotdo/", env!("CARGO_PKG_VERSION"));

const MESSAGE_PATH: &str = "/api/message";
const ECHO_PATH: &str = "/api/post-message";
const TODOS_PATH: &str = "/api/todos";
const PLOT_PATH: &str = "/api/generate-plot/";

#[derive(Deserialize)]
struct MessageResponse {
    message: Option<String>,
}

#[derive(Deserialize)]
struct EchoResponse {
    message: Option<String>,
    original_message: Option<String>,
}

#[derive(Deserialize)]
struct PlotResponse {
    image: Option<String>,
    error: Option<String>,
}

/// HTTP implementation of [`Backend`]
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url` (e.g. `http://127.0.0.1:5000`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if err.is_decode() {
            ApiError::ResponseShape(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// Send a request and turn non-2xx statuses into errors
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(
                status.as_u16(),
                status.canonical_reason(),
                &body,
            ));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| self.classify(e))
    }
}

fn missing(field: &str) -> ApiError {
    ApiError::ResponseShape(format!("missing `{}` field", field))
}

#[async_trait]
impl Backend for HttpBackend {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn status_message(&self) -> Result<String, ApiError> {
        let start = Instant::now();
        let body: MessageResponse = self.send_json(self.client.get(self.url(MESSAGE_PATH))).await?;
        tracing::info!("Fetched status message in {:.1}s", start.elapsed().as_secs_f32());
        body.message.ok_or_else(|| missing("message"))
    }

    async fn echo_message(&self, message: &str) -> Result<EchoReply, ApiError> {
        let request = self
            .client
            .post(self.url(ECHO_PATH))
            .json(&json!({ "message": message }));
        let body: EchoResponse = self.send_json(request).await?;

        Ok(EchoReply {
            message: body.message.ok_or_else(|| missing("message"))?,
            original_message: body.original_message.unwrap_or_else(|| message.to_string()),
        })
    }

    async fn list_todos(&self) -> Result<Vec<TodoItem>, ApiError> {
        let start = Instant::now();
        let items: Vec<TodoItem> = self.send_json(self.client.get(self.url(TODOS_PATH))).await?;
        tracing::info!(
            "Fetched {} to-do items in {:.1}s",
            items.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(items)
    }

    async fn add_todo(&self, text: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url(TODOS_PATH))
            .json(&json!({ "text": text }));
        self.send(request).await?;
        tracing::info!("Added to-do item: {:?}", text);
        Ok(())
    }

    async fn generate_plot(&self, amplitude: f64) -> Result<PlotImage, ApiError> {
        let start = Instant::now();
        let request = self
            .client
            .post(self.url(PLOT_PATH))
            .json(&json!({ "amplitude": amplitude }));
        let body: PlotResponse = self.send_json(request).await?;

        if let Some(error) = body.error {
            return Err(ApiError::Validation(error));
        }
        let image = body.image.ok_or_else(|| missing("image"))?;
        tracing::info!(
            "Generated plot for amplitude {} in {:.1}s",
            amplitude,
            start.elapsed().as_secs_f32()
        );
        Ok(PlotImage::new(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Todos = Arc<Mutex<Vec<Value>>>;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn list_todos(State(todos): State<Todos>) -> Json<Vec<Value>> {
        Json(todos.lock().unwrap().clone())
    }

    async fn add_todo(
        State(todos): State<Todos>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let Some(text) = body.get("text").and_then(|t| t.as_str()) else {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing \"text\" field in JSON payload." })),
            );
        };
        let mut todos = todos.lock().unwrap();
        let id = todos.len() as i64 + 1;
        todos.insert(0, json!({ "id": id, "text": text, "created_at": "2025-06-01 10:30:00" }));
        (StatusCode::CREATED, Json(json!({ "status": "success", "text": text })))
    }

    async fn generate_plot(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let amplitude = body.get("amplitude").and_then(|a| a.as_f64()).unwrap_or(0.0);
        if amplitude <= 0.0 {
            (StatusCode::OK, Json(json!({ "error": "Invalid amplitude provided." })))
        } else {
            (StatusCode::OK, Json(json!({ "image": "aGVsbG8=" })))
        }
    }

    async fn echo(Json(body): Json<Value>) -> Json<Value> {
        let message = body.get("message").and_then(|m| m.as_str()).unwrap_or_default();
        Json(json!({
            "status": "success",
            "message": format!("received '{}'", message),
            "original_message": message,
        }))
    }

    fn demo_router() -> Router {
        let todos: Todos = Arc::new(Mutex::new(Vec::new()));
        Router::new()
            .route(
                "/api/message",
                get(|| async { Json(json!({ "status": "success", "message": "hello" })) }),
            )
            .route("/api/post-message", post(echo))
            .route("/api/generate-plot/", post(generate_plot))
            .route("/api/todos", get(list_todos).post(add_todo))
            .with_state(todos)
    }

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = backend("http://localhost:5000/");
        assert_eq!(backend.base_url(), "http://localhost:5000");
        assert_eq!(backend.url(TODOS_PATH), "http://localhost:5000/api/todos");
    }

    #[tokio::test]
    async fn test_status_message() {
        let base = serve(demo_router()).await;
        assert_eq!(backend(&base).status_message().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_echo_message() {
        let base = serve(demo_router()).await;
        let reply = backend(&base).echo_message("ping").await.unwrap();
        assert_eq!(reply.message, "received 'ping'");
        assert_eq!(reply.original_message, "ping");
    }

    #[tokio::test]
    async fn test_add_then_list_todos() {
        let base = serve(demo_router()).await;
        let backend = backend(&base);

        backend.add_todo("walk dog").await.unwrap();
        backend.add_todo("buy milk").await.unwrap();

        let items = backend.list_todos().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "buy milk");
        assert_eq!(items[1].text, "walk dog");
    }

    #[tokio::test]
    async fn test_generate_plot() {
        let base = serve(demo_router()).await;
        let backend = backend(&base);

        let image = backend.generate_plot(2.5).await.unwrap();
        assert_eq!(image.as_base64(), "aGVsbG8=");
        assert_eq!(image.decode_png().unwrap(), b"hello");

        let err = backend.generate_plot(-1.0).await.unwrap_err();
        assert_eq!(err, ApiError::Validation("Invalid amplitude provided.".into()));
    }

    #[tokio::test]
    async fn test_http_status_error_uses_body() {
        let router = Router::new().route(
            "/api/todos",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Missing \"text\" field in JSON payload." })),
                )
            }),
        );
        let base = serve(router).await;

        let err = backend(&base).add_todo("x").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::HttpStatus {
                status: 400,
                message: "Missing \"text\" field in JSON payload.".into()
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let router = Router::new().route(
            "/api/message",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let base = serve(router).await;

        let err = backend(&base).status_message().await.unwrap_err();
        assert_eq!(
            err,
            ApiError::HttpStatus { status: 503, message: "Service Unavailable".into() }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_field_is_shape_error() {
        let router = Router::new().route(
            "/api/message",
            get(|| async { Json(json!({ "status": "success" })) }),
        );
        let base = serve(router).await;

        let err = backend(&base).status_message().await.unwrap_err();
        assert_eq!(err, ApiError::ResponseShape("missing `message` field".into()));
    }

    #[tokio::test]
    async fn test_invalid_json_is_shape_error() {
        let router = Router::new().route("/api/todos", get(|| async { "not json" }));
        let base = serve(router).await;

        let err = backend(&base).list_todos().await.unwrap_err();
        assert!(matches!(err, ApiError::ResponseShape(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(&format!("http://{}", addr)).status_message().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let router = Router::new().route(
            "/api/message",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "message": "late" }))
            }),
        );
        let base = serve(router).await;

        let backend = HttpBackend::new(&base, Duration::from_millis(200)).unwrap();
        let err = backend.status_message().await.unwrap_err();
        assert_eq!(err, ApiError::Timeout(Duration::from_millis(200)));
    }
}
