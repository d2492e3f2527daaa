//! Context API for middleware
//!
//! The Context provides middleware with access to:
//! - Pre-established service connections
//! - Request metadata (request id, trace context)
//! - Runtime configuration

use std::sync::Arc;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use edge_middleware_sdk::{HandlerContext, TraceContext};
use super::services::{Client, ServiceError, Services};

/// Request identifier for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Create a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Middleware execution timeout in seconds
    pub handler_timeout_secs: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    pub debug: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            handler_timeout_secs: 30,
            max_body_size: 1024 * 1024,
            debug: false,
        }
    }
}

/// Context passed to every middleware call
///
/// Cheap to clone; pass it by reference.
///
/// # Example
///
/// ```ignore
/// let orm = ctx.orm()?;
/// let users = orm.model::<User>();
/// let (first, all) = orm.transaction((users.find_first(), users.find_many())).await?;
/// tracing::info!(request_id = %ctx.request_id, "Loaded users");
/// ```
#[derive(Clone)]
pub struct Context {
    /// Pre-established service connections
    pub services: Services,

    /// Unique request identifier
    pub request_id: RequestId,

    /// Trace context for work done on behalf of this request
    pub trace: TraceContext,

    /// Configuration snapshot
    pub config: Arc<RuntimeConfig>,
}

impl HandlerContext for Context {}

impl Context {
    /// ORM client whose statements carry this request's trace context
    pub fn orm(&self) -> Result<Client, ServiceError> {
        Ok(self.services.orm()?.with_trace(self.trace.clone()))
    }

    pub fn is_debug(&self) -> bool {
        self.config.debug
    }

    /// Get middleware timeout duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.handler_timeout_secs)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("trace", &self.trace.traceparent())
            .field("services", &self.services)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for creating Context instances
pub struct ContextBuilder {
    services: Services,
    config: Option<Arc<RuntimeConfig>>,
    request_id: Option<RequestId>,
    trace: Option<TraceContext>,
}

impl ContextBuilder {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            config: None,
            request_id: None,
            trace: None,
        }
    }

    pub fn config(mut self, config: Arc<RuntimeConfig>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Build the context; a missing trace starts a new root trace
    pub fn build(self) -> Context {
        Context {
            services: self.services,
            request_id: self.request_id.unwrap_or_default(),
            trace: self.trace.unwrap_or_else(TraceContext::new_root),
            config: self.config.unwrap_or_else(|| Arc::new(RuntimeConfig::default())),
        }
    }
}
