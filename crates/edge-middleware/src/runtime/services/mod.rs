//! Actor-based services
//!
//! Long-lived service actors handed to middleware through the Context:
//! - Database (SQL over rusqlite, with transactional batching)
//! - ORM client (typed model access on top of the database actor)

pub mod database;
pub mod orm;

use edge_middleware_sdk::HandlerError;

use crate::runtime::actor::ActorError;

pub use database::{Database, DatabaseConfig, Row};
pub use orm::{Client, Model};

/// Container for all available services
///
/// This is passed to middleware via Context and provides access to
/// pre-established, long-lived service connections.
#[derive(Clone, Default)]
pub struct Services {
    /// Database service
    pub db: Option<Database>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add database service
    pub fn with_db(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    /// Get database or return error
    pub fn require_db(&self) -> Result<&Database, ServiceError> {
        self.db.as_ref().ok_or(ServiceError::NotConfigured("database"))
    }

    /// ORM client over the configured database
    pub fn orm(&self) -> Result<Client, ServiceError> {
        self.require_db().map(|db| Client::new(db.clone()))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("db", &self.db.is_some())
            .finish()
    }
}

/// Errors related to service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Service not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unexpected result shape: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ActorError> for ServiceError {
    fn from(err: ActorError) -> Self {
        ServiceError::Unavailable(err.to_string())
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::QueryFailed(err.to_string())
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotConfigured(_) | ServiceError::Unavailable(_) => {
                HandlerError::ServiceUnavailable(err.to_string())
            }
            ServiceError::InvalidConfig(_) => HandlerError::Internal(err.to_string()),
            _ => HandlerError::Database(err.to_string()),
        }
    }
}
