//! Middleware registry
//!
//! Holds the ordered middleware chain and runs it for each request. The
//! first middleware that produces a response wins; if all of them pass
//! through, the caller falls back to the platform default.

use std::sync::Arc;
use std::time::Duration;

use edge_middleware_sdk::{HandlerError, Middleware, MiddlewareResult, Request};

use super::context::Context;

/// Ordered chain of middleware
#[derive(Default)]
pub struct MiddlewareRegistry {
    chain: Vec<Arc<dyn Middleware<Context>>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the end of the chain (builder pattern)
    pub fn with<M: Middleware<Context>>(mut self, middleware: M) -> Self {
        self.register(middleware);
        self
    }

    pub fn register<M: Middleware<Context>>(&mut self, middleware: M) {
        tracing::debug!(middleware = middleware.name(), "Registered middleware");
        self.chain.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Run the chain in order; `Ok(None)` means every middleware passed through
    pub async fn execute(&self, ctx: &Context, req: Request) -> MiddlewareResult {
        for middleware in &self.chain {
            if let Some(response) = middleware.call(ctx, req.clone()).await? {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    middleware = middleware.name(),
                    status = response.status,
                    "Middleware produced a response"
                );
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Run the chain, giving up after `timeout`
    pub async fn execute_with_timeout(
        &self,
        ctx: &Context,
        req: Request,
        timeout: Duration,
    ) -> MiddlewareResult {
        tokio::time::timeout(timeout, self.execute(ctx, req))
            .await
            .map_err(|_| HandlerError::Timeout)?
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.chain.iter().map(|m| m.name()))
            .finish()
    }
}
