//! Middleware trait and supporting types
//!
//! Middleware runs before the platform's normal routing. Each invocation
//! either produces a response, which short-circuits the request, or passes
//! through by returning `Ok(None)`.
//!
//! # Example
//!
//! ```ignore
//! use edge_middleware_sdk::prelude::*;
//!
//! struct Hello;
//!
//! impl<Ctx: HandlerContext> Middleware<Ctx> for Hello {
//!     fn name(&self) -> &str { "hello" }
//!
//!     fn call<'a>(&'a self, _ctx: &'a Ctx, req: Request) -> BoxFuture<'a, MiddlewareResult> {
//!         Box::pin(async move {
//!             if !req.is_path("/hello") {
//!                 return Ok(None);
//!             }
//!             Ok(Some(Response::ok(json!({"message": "Hello!"}))))
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::{HandlerError, Request, Response};

/// Type alias for boxed future returned by middleware
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a middleware call: `Some` short-circuits, `None` passes through
pub type MiddlewareResult = Result<Option<Response>, HandlerError>;

/// Trait for types that can be used as middleware context
///
/// This is implemented by the runtime's Context type
pub trait HandlerContext: Send + Sync + 'static {}

/// A request-interception hook
pub trait Middleware<Ctx: HandlerContext>: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Inspect the request and optionally answer it
    fn call<'a>(&'a self, ctx: &'a Ctx, req: Request) -> BoxFuture<'a, MiddlewareResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;
    impl HandlerContext for Empty {}

    struct Hello;

    impl Middleware<Empty> for Hello {
        fn name(&self) -> &str {
            "hello"
        }

        fn call<'a>(&'a self, _ctx: &'a Empty, req: Request) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async move {
                if !req.is_path("/hello") {
                    return Ok(None);
                }
                Ok(Some(Response::text(200, "hi")))
            })
        }
    }

    #[tokio::test]
    async fn test_middleware_pass_through() {
        let hit = Hello.call(&Empty, Request::new("GET", "/hello")).await.unwrap();
        assert_eq!(hit.map(|r| r.status), Some(200));

        let miss = Hello.call(&Empty, Request::new("GET", "/")).await.unwrap();
        assert!(miss.is_none());
    }
}
