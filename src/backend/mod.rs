//! Access to the demo API backend.
//!
//! This module provides:
//!
//! - `Backend`: the operations the screens issue (status, echo, to-do list, plot)
//! - `HttpBackend`: reqwest client speaking JSON to the real server
//! - `MockBackend`: in-process simulation with an artificial plot delay
//! - `ApiError`: the failure taxonomy, collapsed to one message at the UI boundary
//!
//! Wire models (`TodoItem`, `PlotImage`, `EchoReply`) are shared by both
//! implementations.

mod http;
mod mock;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub use http::HttpBackend;
pub use mock::{MOCK_PLOT_IMAGE, MockBackend};

/// Timestamp format used by the backend for `created_at`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from a single backend call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Network unreachable, connection refused, broken body stream
    #[error("Could not reach the backend: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("Server returned {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Input rejected before or by the backend
    #[error("{0}")]
    Validation(String),

    /// 2xx response missing an expected field or not valid JSON
    #[error("Unexpected response: {0}")]
    ResponseShape(String),
}

impl ApiError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Timeout(_) => true,
            ApiError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            ApiError::Validation(_) | ApiError::ResponseShape(_) => false,
        }
    }

    /// Build an HTTP status error, preferring the `error`/`message` field of a JSON body
    pub fn from_status(status: u16, reason: Option<&str>, body: &str) -> Self {
        let from_body = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                ["error", "message"]
                    .iter()
                    .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
            });

        let message = from_body
            .or_else(|| reason.map(str::to_string))
            .unwrap_or_else(|| "Unknown error".to_string());

        ApiError::HttpStatus { status, message }
    }
}

/// Server-assigned to-do identifier; ordering follows creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(pub i64);

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A to-do entry as returned by `GET /api/todos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TodoItem {
    /// Parsed creation time, if the backend sent one in its usual format
    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created_at
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok())
    }
}

/// Base64-encoded PNG produced by the plot endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotImage(String);

impl PlotImage {
    pub fn new(base64: impl Into<String>) -> Self {
        Self(base64.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// Decode the payload into raw PNG bytes
    pub fn decode_png(&self) -> Result<Vec<u8>, ApiError> {
        base64::engine::general_purpose::STANDARD
            .decode(self.0.trim())
            .map_err(|e| ApiError::ResponseShape(format!("image is not valid base64: {}", e)))
    }
}

/// Reply of the echo endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    pub message: String,
    pub original_message: String,
}

/// The operations a screen can issue against the backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /api/message`
    async fn status_message(&self) -> Result<String, ApiError>;

    /// `POST /api/post-message`
    async fn echo_message(&self, message: &str) -> Result<EchoReply, ApiError>;

    /// `GET /api/todos`, newest first
    async fn list_todos(&self) -> Result<Vec<TodoItem>, ApiError>;

    /// `POST /api/todos`
    async fn add_todo(&self, text: &str) -> Result<(), ApiError>;

    /// `POST /api/generate-plot/`
    async fn generate_plot(&self, amplitude: f64) -> Result<PlotImage, ApiError>;

    /// Where requests go, for display
    fn describe(&self) -> String;
}

/// Build the backend selected by the configuration
pub fn connect(config: &Config) -> Result<Arc<dyn Backend>> {
    if config.backend.mock {
        tracing::info!("Using simulated backend");
        return Ok(Arc::new(MockBackend::new(Duration::from_millis(
            config.plot.mock_delay_ms,
        ))));
    }

    let backend = HttpBackend::new(&config.backend.base_url, request_timeout(config))?;
    tracing::info!("Using backend at {}", backend.base_url());
    Ok(Arc::new(backend))
}

/// Per-request timeout; a hand-edited `timeout_secs = 0` still gets one second
fn request_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.backend.timeout_secs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Transport("refused".into()).is_retryable());
        assert!(ApiError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ApiError::HttpStatus { status: 503, message: "down".into() }.is_retryable());
        assert!(ApiError::HttpStatus { status: 429, message: "slow".into() }.is_retryable());
        assert!(!ApiError::HttpStatus { status: 400, message: "bad".into() }.is_retryable());
        assert!(!ApiError::Validation("amplitude must be positive".into()).is_retryable());
        assert!(!ApiError::ResponseShape("missing field".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ApiError::Validation("amplitude must be positive".into()).to_string(),
            "amplitude must be positive"
        );
        assert_eq!(
            ApiError::Timeout(Duration::from_secs(10)).to_string(),
            "Request timed out after 10s"
        );
        assert_eq!(
            ApiError::HttpStatus { status: 404, message: "Not Found".into() }.to_string(),
            "Server returned 404: Not Found"
        );
    }

    #[test]
    fn test_from_status_prefers_body() {
        let err = ApiError::from_status(400, Some("Bad Request"), r#"{"error": "Missing \"text\" field"}"#);
        assert_eq!(
            err,
            ApiError::HttpStatus { status: 400, message: "Missing \"text\" field".into() }
        );

        let err = ApiError::from_status(400, Some("Bad Request"), r#"{"status": "error", "message": "no message"}"#);
        assert_eq!(err, ApiError::HttpStatus { status: 400, message: "no message".into() });

        let err = ApiError::from_status(502, Some("Bad Gateway"), "<html>oops</html>");
        assert_eq!(err, ApiError::HttpStatus { status: 502, message: "Bad Gateway".into() });

        let err = ApiError::from_status(599, None, "");
        assert_eq!(err, ApiError::HttpStatus { status: 599, message: "Unknown error".into() });
    }

    #[test]
    fn test_todo_item_parsing() {
        let items: Vec<TodoItem> = serde_json::from_str(
            r#"[
                {"id": 2, "text": "buy milk", "created_at": "2025-06-01 10:30:00"},
                {"id": 1, "text": "walk dog"}
            ]"#,
        )
        .unwrap();

        assert_eq!(items[0].id, TodoId(2));
        assert_eq!(items[0].text, "buy milk");
        let created = items[0].created().unwrap();
        assert_eq!(created.format("%H:%M").to_string(), "10:30");
        assert!(items[1].created().is_none());
        assert!(items[0].id > items[1].id);
        assert_eq!(items[1].id.to_string(), "#1");
    }

    #[test]
    fn test_plot_image_decode() {
        let image = PlotImage::new(MOCK_PLOT_IMAGE);
        let bytes = image.decode_png().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let broken = PlotImage::new("not base64 !!");
        assert!(matches!(broken.decode_png(), Err(ApiError::ResponseShape(_))));
    }

    #[test]
    fn test_connect_selects_mock() {
        let mut config = Config::default();
        config.backend.mock = true;
        assert!(connect(&config).is_ok());

        config.backend.mock = false;
        assert!(connect(&config).is_ok());
    }

    #[test]
    fn test_connect_describes_backend() {
        let mut config = Config::default();
        config.backend.base_url = "http://10.0.0.2:8080".into();
        assert_eq!(connect(&config).unwrap().describe(), "http://10.0.0.2:8080");

        config.backend.mock = true;
        assert_eq!(connect(&config).unwrap().describe(), "simulated backend");
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert_eq!(request_timeout(&config), Duration::from_secs(1));
        assert!(connect(&config).is_ok());

        config.backend.timeout_secs = 7;
        assert_eq!(request_timeout(&config), Duration::from_secs(7));
    }
}
