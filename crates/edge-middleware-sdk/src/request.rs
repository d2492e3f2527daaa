//! HTTP Request representation for middleware

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Name of the W3C trace context header
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Represents an incoming HTTP request as seen by middleware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    pub method: String,

    /// URL pathname, without query string (e.g., "/items/123")
    pub path: String,

    /// Query parameters
    #[serde(default)]
    pub query: HashMap<String, String>,

    /// HTTP headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request body
    #[serde(default)]
    pub body: Option<String>,

    /// Request ID for tracing
    #[serde(default)]
    pub request_id: String,
}

impl Request {
    /// Build a request for `method` and `path` with everything else empty.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Add a header (builder pattern).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Get a query parameter as a string reference.
    ///
    /// # Example
    /// ```ignore
    /// // URL: /search?q=rust
    /// let query = req.query_param("q"); // Some(&"rust".to_string())
    /// ```
    pub fn query_param(&self, key: &str) -> Option<&String> {
        self.query.get(key)
    }

    /// Get a query parameter parsed as a specific type.
    /// Returns None if the parameter doesn't exist or can't be parsed.
    pub fn query_param_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.query.get(key).and_then(|v| v.parse().ok())
    }

    /// Get a header value (case-insensitive lookup).
    ///
    /// # Example
    /// ```ignore
    /// let auth = req.header("Authorization"); // Works with any case
    /// ```
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// The raw `traceparent` header, if the caller sent one.
    pub fn traceparent(&self) -> Option<&str> {
        self.header(TRACEPARENT_HEADER).map(String::as_str)
    }

    /// Check if request method matches (case-insensitive).
    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    /// Check if the request targets exactly `path`.
    pub fn is_path(&self, path: &str) -> bool {
        self.path == path
    }
}

impl Default for Request {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
            request_id: String::new(),
        }
    }
}
