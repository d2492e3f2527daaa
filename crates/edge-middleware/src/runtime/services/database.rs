//! Database actor service
//!
//! A single long-lived SQLite connection owned by an actor task. Besides
//! one-shot queries it runs batches of statements inside one transaction,
//! tagging every statement with the caller's trace context.

use std::collections::HashMap;
use std::path::Path;

use edge_middleware_sdk::TraceContext;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::ServiceError;
use crate::runtime::actor::{spawn_actor, ActorError, ActorHandle, ActorMessage};

const IN_MEMORY: &str = ":memory:";

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database type, only `sqlite` is supported
    #[serde(rename = "type")]
    pub db_type: String,

    /// Path to the SQLite file, or `:memory:`
    pub url: String,

    /// Command channel capacity
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_queue_size() -> usize { 100 }

impl DatabaseConfig {
    pub fn sqlite(url: impl Into<String>) -> Self {
        Self {
            db_type: "sqlite".to_string(),
            url: url.into(),
            queue_size: default_queue_size(),
        }
    }
}

/// Row representation - generic container for query results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: HashMap<String, serde_json::Value>,
}

impl Row {
    /// Get a value by column name
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.values.get(column)
    }

    /// Get a value and try to convert it to the specified type
    pub fn get_as<T: for<'de> Deserialize<'de>>(&self, column: &str) -> Option<T> {
        self.values
            .get(column)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// How the rows of a batched statement are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// Keep only the first row
    First,
    /// Keep every row
    All,
    /// Statement does not return rows; report the affected count
    Affected,
}

/// One statement in a transactional batch
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<serde_json::Value>,
    pub fetch: Fetch,
}

impl Statement {
    pub fn first(sql: impl Into<String>, params: Vec<serde_json::Value>) -> Self {
        Self { sql: sql.into(), params, fetch: Fetch::First }
    }

    pub fn all(sql: impl Into<String>, params: Vec<serde_json::Value>) -> Self {
        Self { sql: sql.into(), params, fetch: Fetch::All }
    }

    pub fn execute(sql: impl Into<String>, params: Vec<serde_json::Value>) -> Self {
        Self { sql: sql.into(), params, fetch: Fetch::Affected }
    }
}

/// Result of one statement in a transactional batch
#[derive(Debug, Clone)]
pub enum StatementOutput {
    First(Option<Row>),
    All(Vec<Row>),
    Affected(u64),
}

/// Commands sent to the database actor
pub enum DatabaseCommand {
    /// Execute a query and return all rows
    Query {
        sql: String,
        params: Vec<serde_json::Value>,
        reply: oneshot::Sender<Result<Vec<Row>, ServiceError>>,
    },

    /// Execute a query and return the first row
    QueryOne {
        sql: String,
        params: Vec<serde_json::Value>,
        reply: oneshot::Sender<Result<Option<Row>, ServiceError>>,
    },

    /// Execute a statement (INSERT, UPDATE, DELETE) and return affected rows
    Execute {
        sql: String,
        params: Vec<serde_json::Value>,
        reply: oneshot::Sender<Result<u64, ServiceError>>,
    },

    /// Execute several parameterless statements (schema setup)
    ExecuteBatch {
        sql: String,
        reply: oneshot::Sender<Result<(), ServiceError>>,
    },

    /// Run statements in order inside one transaction
    Transaction {
        statements: Vec<Statement>,
        trace: Option<TraceContext>,
        reply: oneshot::Sender<Result<Vec<StatementOutput>, ServiceError>>,
    },

    /// Check if the connection is healthy
    Health {
        reply: oneshot::Sender<Result<bool, ServiceError>>,
    },

    /// Shutdown the actor
    Shutdown,
}

impl ActorMessage for DatabaseCommand {}

/// Database service handle - cheap to clone, send commands to the actor
#[derive(Clone)]
pub struct Database {
    handle: ActorHandle<DatabaseCommand>,
    config: DatabaseConfig,
}

impl Database {
    /// Open the connection, start the database actor and return a handle
    pub async fn start(config: DatabaseConfig) -> Result<Self, ServiceError> {
        if config.db_type != "sqlite" {
            return Err(ServiceError::InvalidConfig(format!(
                "unsupported database type: {}",
                config.db_type
            )));
        }

        let conn = open_sqlite(&config.url)?;
        let handle = spawn_actor(config.queue_size, move |rx| database_actor(conn, rx));

        tracing::info!(url = %config.url, "Database actor started");
        Ok(Self { handle, config })
    }

    /// Execute a query and return all matching rows
    pub async fn query(&self, sql: &str, params: &[serde_json::Value]) -> Result<Vec<Row>, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.handle.send(DatabaseCommand::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
            reply: tx,
        }).await?;
        rx.await.map_err(ActorError::from)?
    }

    /// Execute a query and return the first row (if any)
    pub async fn query_one(&self, sql: &str, params: &[serde_json::Value]) -> Result<Option<Row>, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.handle.send(DatabaseCommand::QueryOne {
            sql: sql.to_string(),
            params: params.to_vec(),
            reply: tx,
        }).await?;
        rx.await.map_err(ActorError::from)?
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, sql: &str, params: &[serde_json::Value]) -> Result<u64, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.handle.send(DatabaseCommand::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
            reply: tx,
        }).await?;
        rx.await.map_err(ActorError::from)?
    }

    /// Execute a semicolon-separated batch without parameters
    pub async fn execute_batch(&self, sql: &str) -> Result<(), ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.handle.send(DatabaseCommand::ExecuteBatch {
            sql: sql.to_string(),
            reply: tx,
        }).await?;
        rx.await.map_err(ActorError::from)?
    }

    /// Run `statements` in one transaction, returning one output per statement.
    ///
    /// When `trace` is set each statement carries its `traceparent` as a
    /// trailing SQL comment. Any failure rolls the whole batch back.
    pub async fn transaction(
        &self,
        statements: Vec<Statement>,
        trace: Option<TraceContext>,
    ) -> Result<Vec<StatementOutput>, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.handle.send(DatabaseCommand::Transaction {
            statements,
            trace,
            reply: tx,
        }).await?;
        rx.await.map_err(ActorError::from)?
    }

    /// Check connection health
    pub async fn health(&self) -> Result<bool, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.handle.send(DatabaseCommand::Health { reply: tx }).await?;
        rx.await.map_err(ActorError::from)?
    }

    /// Ask the actor to stop; queued commands ahead of this one still run
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.handle.send(DatabaseCommand::Shutdown).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("type", &self.config.db_type)
            .field("alive", &self.handle.is_alive())
            .finish()
    }
}

fn open_sqlite(url: &str) -> Result<rusqlite::Connection, ServiceError> {
    if url == IN_MEMORY {
        return rusqlite::Connection::open_in_memory()
            .map_err(|e| ServiceError::ConnectionFailed(e.to_string()));
    }

    if let Some(parent) = Path::new(url).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ServiceError::ConnectionFailed(format!("{}: {}", parent.display(), e)))?;
    }

    rusqlite::Connection::open(url).map_err(|e| ServiceError::ConnectionFailed(e.to_string()))
}

/// The database actor loop - owns the connection and processes commands
async fn database_actor(mut conn: rusqlite::Connection, mut rx: mpsc::Receiver<DatabaseCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            DatabaseCommand::Query { sql, params, reply } => {
                let _ = reply.send(execute_sqlite_query(&conn, &sql, &params));
            }

            DatabaseCommand::QueryOne { sql, params, reply } => {
                let result = execute_sqlite_query(&conn, &sql, &params)
                    .map(|rows| rows.into_iter().next());
                let _ = reply.send(result);
            }

            DatabaseCommand::Execute { sql, params, reply } => {
                let _ = reply.send(execute_sqlite_statement(&conn, &sql, &params));
            }

            DatabaseCommand::ExecuteBatch { sql, reply } => {
                let _ = reply.send(conn.execute_batch(&sql).map_err(ServiceError::from));
            }

            DatabaseCommand::Transaction { statements, trace, reply } => {
                let _ = reply.send(run_transaction(&mut conn, &statements, trace.as_ref()));
            }

            DatabaseCommand::Health { reply } => {
                let healthy = conn
                    .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .is_ok();
                let _ = reply.send(Ok(healthy));
            }

            DatabaseCommand::Shutdown => {
                tracing::info!("Database actor shutting down");
                break;
            }
        }
    }

    tracing::info!("Database actor stopped");
}

fn run_transaction(
    conn: &mut rusqlite::Connection,
    statements: &[Statement],
    trace: Option<&TraceContext>,
) -> Result<Vec<StatementOutput>, ServiceError> {
    let span = tracing::debug_span!(
        "db.transaction",
        statements = statements.len(),
        traceparent = ?trace.map(TraceContext::traceparent),
    );
    let _entered = span.enter();

    // Dropping the transaction on an early return rolls it back.
    let tx = conn.transaction()?;
    let mut outputs = Vec::with_capacity(statements.len());

    for statement in statements {
        let sql = annotate_sql(&statement.sql, trace);
        tracing::debug!(sql = %sql, "Executing batched statement");

        let output = match statement.fetch {
            Fetch::First => StatementOutput::First(
                execute_sqlite_query(&tx, &sql, &statement.params)?.into_iter().next(),
            ),
            Fetch::All => StatementOutput::All(execute_sqlite_query(&tx, &sql, &statement.params)?),
            Fetch::Affected => {
                StatementOutput::Affected(execute_sqlite_statement(&tx, &sql, &statement.params)?)
            }
        };
        outputs.push(output);
    }

    tx.commit()?;
    Ok(outputs)
}

/// Append a sqlcommenter-style `traceparent` tag to `sql`.
///
/// Without a trace context the statement is returned untouched, so the engine
/// never receives a placeholder value.
pub fn annotate_sql(sql: &str, trace: Option<&TraceContext>) -> String {
    let sql = sql.trim_end().trim_end_matches(';');
    match trace {
        Some(trace) => format!("{} /*traceparent='{}'*/", sql, trace.traceparent()),
        None => sql.to_string(),
    }
}

/// Execute a SQLite query and return rows
fn execute_sqlite_query(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[serde_json::Value],
) -> Result<Vec<Row>, ServiceError> {
    let mut stmt = conn.prepare(sql)?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let sqlite_params: Vec<SqlValue> = params.iter().map(json_to_sqlite_value).collect();

    let rows = stmt.query_map(rusqlite::params_from_iter(sqlite_params.iter()), |row| {
        let mut values = HashMap::new();
        for (i, col) in column_names.iter().enumerate() {
            values.insert(col.clone(), sqlite_value_to_json(row.get_ref(i)?));
        }
        Ok(Row { values })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(ServiceError::from)
}

/// Execute a SQLite statement and return affected rows
fn execute_sqlite_statement(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[serde_json::Value],
) -> Result<u64, ServiceError> {
    let sqlite_params: Vec<SqlValue> = params.iter().map(json_to_sqlite_value).collect();
    let affected = conn.execute(sql, rusqlite::params_from_iter(sqlite_params.iter()))?;
    Ok(affected as u64)
}

/// Convert a JSON value to a SQLite value
fn json_to_sqlite_value(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Null
            }
        }
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            SqlValue::Text(nested.to_string())
        }
    }
}

/// Convert a SQLite value to JSON
fn sqlite_value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
    }
}
