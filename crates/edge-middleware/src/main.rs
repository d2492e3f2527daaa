//! Edge Middleware - Main entry point
//!
//! This is the edge runtime that:
//! - Accepts HTTP requests and runs them through the middleware chain
//! - Owns the database actor the ORM client talks to
//! - Falls back to the platform default when no middleware answers

mod config;
mod router;
mod runtime;
mod users;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_middleware_sdk::TraceContext;

use crate::config::AppConfig;
use crate::runtime::services::{Database, Services};
use crate::runtime::{Context, ContextBuilder, MiddlewareRegistry, RequestId, RuntimeConfig};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub runtime_config: Arc<RuntimeConfig>,
    pub services: Services,
    pub middleware: MiddlewareRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, services: Services, middleware: MiddlewareRegistry) -> Self {
        let runtime_config = Arc::new(RuntimeConfig {
            handler_timeout_secs: config.handler_timeout_secs,
            max_body_size: config.max_body_size,
            debug: config.debug,
        });

        Self {
            config,
            runtime_config,
            services,
            middleware,
        }
    }

    /// Build the per-request context handed to middleware
    pub fn create_context(&self, request_id: RequestId, trace: TraceContext) -> Context {
        ContextBuilder::new(self.services.clone())
            .config(self.runtime_config.clone())
            .request_id(request_id)
            .trace(trace)
            .build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,edge_middleware=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Edge Middleware");

    let config = AppConfig::from_env();
    tracing::info!("Configuration loaded: {:?}", config);

    let db = Database::start(config.database_config()).await?;

    if config.migrate {
        users::migrate(&db).await?;
    }

    let services = Services::new().with_db(db.clone());
    let middleware = MiddlewareRegistry::new().with(users::RootUsers);
    tracing::info!(chain = ?middleware, "Middleware registered");

    let state = Arc::new(AppState::new(config.clone(), services, middleware));
    let app = router::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Edge runtime listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.shutdown().await?;
    tracing::info!("Edge runtime stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
