//! Runtime module - middleware execution and actor-based services
//!
//! - Context API for middleware
//! - Actor-based services (database, ORM client)
//! - Ordered middleware registry with per-request timeout

pub mod actor;
pub mod context;
pub mod handler;
pub mod services;

pub use context::{Context, ContextBuilder, RequestId, RuntimeConfig};
pub use handler::MiddlewareRegistry;
