//! Root path users middleware
//!
//! `GET /` loads the first user and the full user list in one transaction and
//! returns `{"data": [first, all]}`. Every other path passes through.
//!
//! The batch goes through a transaction on purpose: that is the path where
//! the trace context has to reach the engine intact.

use edge_middleware_sdk::response::JSON_CONTENT_TYPE;
use edge_middleware_sdk::{BoxFuture, HandlerError, Middleware, MiddlewareResult, Request, Response};
use serde::{Deserialize, Serialize};

use crate::runtime::services::{Database, Model, Row, ServiceError};
use crate::runtime::Context;

const ROOT_PATH: &str = "/";

/// Schema of the `users` table
pub const USERS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT
    );
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
}

impl Model for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "email", "name"];
    const PRIMARY_KEY: &'static str = "id";

    fn from_row(row: &Row) -> Result<Self, ServiceError> {
        Ok(Self {
            id: row
                .get_as("id")
                .ok_or_else(|| ServiceError::Decode("users.id is missing or not an integer".into()))?,
            email: row
                .get_as("email")
                .ok_or_else(|| ServiceError::Decode("users.email is missing or not text".into()))?,
            name: match row.get("name") {
                None | Some(serde_json::Value::Null) => None,
                Some(serde_json::Value::String(name)) => Some(name.clone()),
                Some(other) => {
                    return Err(ServiceError::Decode(format!("users.name is not text: {}", other)))
                }
            },
        })
    }
}

/// Create the `users` table if it does not exist
pub async fn migrate(db: &Database) -> Result<(), ServiceError> {
    db.execute_batch(USERS_SCHEMA).await?;
    tracing::info!("Users schema ready");
    Ok(())
}

#[derive(Debug, Serialize)]
struct UsersEnvelope {
    data: (Option<User>, Vec<User>),
}

/// Answers requests for exactly `/`
#[derive(Debug, Clone, Copy, Default)]
pub struct RootUsers;

impl Middleware<Context> for RootUsers {
    fn name(&self) -> &str {
        "root-users"
    }

    fn call<'a>(&'a self, ctx: &'a Context, req: Request) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            if !req.is_path(ROOT_PATH) {
                return Ok(None);
            }
            get_users(ctx).await.map(Some)
        })
    }
}

async fn get_users(ctx: &Context) -> Result<Response, HandlerError> {
    let orm = ctx.orm()?;
    let users = orm.model::<User>();

    let data = orm.transaction((users.find_first(), users.find_many())).await?;

    tracing::debug!(
        request_id = %ctx.request_id,
        trace_id = ctx.trace.trace_id(),
        users = data.1.len(),
        "Loaded users"
    );

    let body = serde_json::to_string(&UsersEnvelope { data })?;
    Ok(Response::new(200)
        .with_header("content-type", JSON_CONTENT_TYPE)
        .with_body(body))
}
