//! HTTP Response representation for middleware

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content type attached to every JSON response.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Represents an outgoing HTTP response.
///
/// # Quick Reference
///
/// | Method | Status | Use Case |
/// |--------|--------|----------|
/// | `ok(body)` | 200 | JSON payload |
/// | `json(status, body)` | any | JSON payload with a custom status |
/// | `text(status, body)` | any | Plain text |
/// | `not_found()` | 404 | Platform default for unmatched requests |
/// | `internal_error(msg)` | 500 | Server error |
/// | `service_unavailable(msg)` | 503 | Backing service down |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,

    /// Response headers, keyed by lowercase header name
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body
    #[serde(default)]
    pub body: Option<String>,
}

impl Response {
    /// Create a new response with the given status code (no body).
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Create a 200 OK response with JSON body.
    ///
    /// # Example
    /// ```ignore
    /// Response::ok(json!({"data": [null, []]}))
    /// ```
    pub fn ok<T: Serialize>(body: T) -> Self {
        Self::json(200, body)
    }

    /// Create a JSON response with a custom status code.
    ///
    /// The `content-type` header is always `application/json;charset=UTF-8`.
    /// If `body` cannot be serialized the response becomes a 500 carrying
    /// `{"error": ...}` instead.
    pub fn json<T: Serialize>(status: u16, body: T) -> Self {
        let (status, body) = match serde_json::to_string(&body) {
            Ok(body) => (status, body),
            Err(e) => (500, serde_json::json!({ "error": e.to_string() }).to_string()),
        };
        Self::new(status)
            .with_header("content-type", JSON_CONTENT_TYPE)
            .with_body(body)
    }

    /// Create a plain text response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body)
    }

    /// Create a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::text(404, "Not Found")
    }

    /// Create a 500 Internal Server Error response.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::json(500, serde_json::json!({"error": message.into()}))
    }

    /// Create a 503 Service Unavailable response.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::json(503, serde_json::json!({"error": message.into()}))
    }

    /// Add a header to the response (builder pattern).
    ///
    /// Header names are case-insensitive, so they are stored lowercased and a
    /// later call replaces an earlier value.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body (builder pattern).
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header value (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}
