//! Edge Middleware SDK - Types and utilities for writing edge middleware hooks
//!
//! This crate provides the core types and traits that middleware uses to
//! intercept requests before the platform's normal routing runs.

pub mod request;
pub mod response;
pub mod error;
pub mod middleware;
pub mod trace;

pub mod prelude {
    //! Common imports for edge middleware
    pub use crate::request::Request;
    pub use crate::response::Response;
    pub use crate::error::HandlerError;
    pub use crate::middleware::{BoxFuture, HandlerContext, Middleware, MiddlewareResult};
    pub use crate::trace::TraceContext;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value as JsonValue};
}

// Re-export key types at crate root
pub use request::Request;
pub use response::Response;
pub use error::HandlerError;
pub use middleware::{BoxFuture, HandlerContext, Middleware, MiddlewareResult};
pub use trace::TraceContext;
