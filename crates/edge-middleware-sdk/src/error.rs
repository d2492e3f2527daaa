//! Error types for edge middleware

use thiserror::Error;

/// Errors that can escape a middleware invocation
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Middleware timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Convert the error to an HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::ServiceUnavailable(_) => 503,
            HandlerError::Timeout => 504,
            _ => 500,
        }
    }

    /// Convert to a Response
    pub fn to_response(&self) -> crate::Response {
        crate::Response::json(
            self.status_code(),
            serde_json::json!({
                "error": self.to_string()
            }),
        )
    }
}

impl From<HandlerError> for crate::Response {
    fn from(err: HandlerError) -> Self {
        err.to_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(HandlerError::Database("boom".into()).status_code(), 500);
        assert_eq!(HandlerError::ServiceUnavailable("db".into()).status_code(), 503);
        assert_eq!(HandlerError::Timeout.status_code(), 504);
    }

    #[test]
    fn test_error_into_response() {
        let response: crate::Response = HandlerError::Database("no such table: users".into()).into();
        assert_eq!(response.status, 500);

        let body: serde_json::Value =
            serde_json::from_str(response.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["error"], "Database error: no such table: users");
    }
}
