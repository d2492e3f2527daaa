//! Application configuration

use std::env;

use crate::runtime::services::DatabaseConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the edge runtime listens on
    pub port: u16,

    /// Database engine backing the ORM client (only `sqlite` is wired up)
    pub db_type: String,

    /// Connection URL or path (for SQLite, `:memory:` is accepted)
    pub database_url: String,

    /// Middleware request timeout in seconds
    pub handler_timeout_secs: u64,

    /// Largest request body handed to middleware, in bytes; bigger bodies are dropped
    pub max_body_size: usize,

    /// Create the `users` table on startup if it is missing
    pub migrate: bool,

    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("EDGE_MIDDLEWARE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),

            db_type: env::var("EDGE_MIDDLEWARE_DB_TYPE")
                .unwrap_or_else(|_| "sqlite".to_string()),

            database_url: env::var("EDGE_MIDDLEWARE_DATABASE_URL")
                .unwrap_or_else(|_| "./data/edge_middleware.db".to_string()),

            handler_timeout_secs: env::var("EDGE_MIDDLEWARE_HANDLER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            max_body_size: env::var("EDGE_MIDDLEWARE_MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),

            migrate: env::var("EDGE_MIDDLEWARE_MIGRATE")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),

            debug: env::var("EDGE_MIDDLEWARE_DEBUG")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(false),
        }
    }

    /// Database actor settings; the queue size keeps its default
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            db_type: self.db_type.clone(),
            ..DatabaseConfig::sqlite(self.database_url.clone())
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
