//! Typed ORM client over the database actor
//!
//! Models describe their table; query descriptors (`FindFirst`, `FindMany`)
//! turn into SQL statements; a tuple of queries is a `Batch` that runs inside
//! one transaction and decodes back into a tuple of typed results.
//!
//! ```ignore
//! let users = client.model::<User>();
//! let (first, all) = client.transaction((users.find_first(), users.find_many())).await?;
//! ```

use std::marker::PhantomData;

use edge_middleware_sdk::TraceContext;

use super::database::{Database, Row, Statement, StatementOutput};
use super::ServiceError;

/// A table-backed entity
pub trait Model: Sized + Send + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const PRIMARY_KEY: &'static str;

    fn from_row(row: &Row) -> Result<Self, ServiceError>;
}

/// A single read or write that can be part of a batch
pub trait Query: Send {
    type Output: Send;

    fn statement(&self) -> Statement;

    fn decode(output: StatementOutput) -> Result<Self::Output, ServiceError>;
}

/// A group of queries executed in one transaction
pub trait Batch: Send {
    type Output: Send;

    fn statements(&self) -> Vec<Statement>;

    fn decode(outputs: Vec<StatementOutput>) -> Result<Self::Output, ServiceError>;
}

/// First row of a model's table, by primary key
pub struct FindFirst<M> {
    _model: PhantomData<fn() -> M>,
}

/// Every row of a model's table, by primary key
pub struct FindMany<M> {
    _model: PhantomData<fn() -> M>,
}

fn select_sql<M: Model>(limit: Option<u32>) -> String {
    let mut sql = format!(
        "SELECT {} FROM {} ORDER BY {} ASC",
        M::COLUMNS.join(", "),
        M::TABLE,
        M::PRIMARY_KEY
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    sql
}

fn unexpected(output: &StatementOutput, wanted: &str) -> ServiceError {
    ServiceError::Decode(format!("expected {} rows, got {:?}", wanted, output))
}

impl<M: Model> Query for FindFirst<M> {
    type Output = Option<M>;

    fn statement(&self) -> Statement {
        Statement::first(select_sql::<M>(Some(1)), vec![])
    }

    fn decode(output: StatementOutput) -> Result<Self::Output, ServiceError> {
        match output {
            StatementOutput::First(row) => row.as_ref().map(M::from_row).transpose(),
            other => Err(unexpected(&other, "first")),
        }
    }
}

impl<M: Model> Query for FindMany<M> {
    type Output = Vec<M>;

    fn statement(&self) -> Statement {
        Statement::all(select_sql::<M>(None), vec![])
    }

    fn decode(output: StatementOutput) -> Result<Self::Output, ServiceError> {
        match output {
            StatementOutput::All(rows) => rows.iter().map(M::from_row).collect(),
            other => Err(unexpected(&other, "all")),
        }
    }
}

macro_rules! impl_batch {
    ($($query:ident $var:ident),+) => {
        impl<$($query: Query),+> Batch for ($($query,)+) {
            type Output = ($(<$query as Query>::Output,)+);

            fn statements(&self) -> Vec<Statement> {
                let ($($var,)+) = self;
                vec![$($var.statement()),+]
            }

            fn decode(outputs: Vec<StatementOutput>) -> Result<Self::Output, ServiceError> {
                let mut outputs = outputs.into_iter();
                let decoded = ($(
                    <$query as Query>::decode(
                        outputs
                            .next()
                            .ok_or_else(|| ServiceError::Decode("batch returned too few results".into()))?,
                    )?,
                )+);
                if outputs.next().is_some() {
                    return Err(ServiceError::Decode("batch returned too many results".into()));
                }
                Ok(decoded)
            }
        }
    };
}

impl_batch!(A a);
impl_batch!(A a, B b);
impl_batch!(A a, B b, C c);

/// Query builder scoped to one model, e.g. `client.model::<User>()`
pub struct Delegate<M> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Delegate<M> {
    pub fn find_first(&self) -> FindFirst<M> {
        FindFirst { _model: PhantomData }
    }

    pub fn find_many(&self) -> FindMany<M> {
        FindMany { _model: PhantomData }
    }
}

/// ORM client handed to middleware
///
/// Cheap to clone. Carries the request's trace context so every statement it
/// sends is tagged with the same `traceparent`.
#[derive(Clone, Debug)]
pub struct Client {
    db: Database,
    trace: Option<TraceContext>,
}

impl Client {
    pub fn new(db: Database) -> Self {
        Self { db, trace: None }
    }

    /// Tag statements sent by this client with `trace`
    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn model<M: Model>(&self) -> Delegate<M> {
        Delegate { _model: PhantomData }
    }

    /// Run every query of `batch` in one transaction
    pub async fn transaction<B: Batch>(&self, batch: B) -> Result<B::Output, ServiceError> {
        let statements = batch.statements();
        let outputs = self.db.transaction(statements, self.trace.clone()).await?;
        B::decode(outputs)
    }

    /// Run a single query
    pub async fn run<Q: Query>(&self, query: Q) -> Result<Q::Output, ServiceError> {
        let (output,) = self.transaction((query,)).await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::services::DatabaseConfig;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Tag {
        id: i64,
        label: String,
    }

    impl Model for Tag {
        const TABLE: &'static str = "tags";
        const COLUMNS: &'static [&'static str] = &["id", "label"];
        const PRIMARY_KEY: &'static str = "id";

        fn from_row(row: &Row) -> Result<Self, ServiceError> {
            Ok(Self {
                id: row.get_as("id").ok_or_else(|| ServiceError::Decode("id".into()))?,
                label: row.get_as("label").ok_or_else(|| ServiceError::Decode("label".into()))?,
            })
        }
    }

    async fn client() -> Client {
        let db = Database::start(DatabaseConfig::sqlite(":memory:")).await.unwrap();
        db.execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL)")
            .await
            .unwrap();
        Client::new(db)
    }

    #[test]
    fn test_select_sql() {
        assert_eq!(
            FindFirst::<Tag> { _model: PhantomData }.statement().sql,
            "SELECT id, label FROM tags ORDER BY id ASC LIMIT 1"
        );
        assert_eq!(
            FindMany::<Tag> { _model: PhantomData }.statement().sql,
            "SELECT id, label FROM tags ORDER BY id ASC"
        );
    }

    #[tokio::test]
    async fn test_transaction_on_empty_table() {
        let client = client().await;
        let tags = client.model::<Tag>();

        let (first, all) = client.transaction((tags.find_first(), tags.find_many())).await.unwrap();
        assert_eq!(first, None);
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_transaction_orders_by_primary_key() {
        let client = client().await;
        client.db.execute(
            "INSERT INTO tags (id, label) VALUES (?, ?), (?, ?)",
            &[json!(7), json!("late"), json!(3), json!("early")],
        ).await.unwrap();

        let tags = client.model::<Tag>();
        let (first, all, again) = client
            .with_trace(TraceContext::new_root())
            .transaction((tags.find_first(), tags.find_many(), tags.find_first()))
            .await
            .unwrap();

        assert_eq!(first, Some(Tag { id: 3, label: "early".into() }));
        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(again, first);
    }

    #[test]
    fn test_decode_rejects_mismatched_shapes() {
        assert!(matches!(
            FindFirst::<Tag>::decode(StatementOutput::All(vec![])),
            Err(ServiceError::Decode(_))
        ));
        assert!(matches!(
            <(FindMany<Tag>,) as Batch>::decode(vec![]),
            Err(ServiceError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_run_single_query() {
        let client = client().await;
        let all = client.run(client.model::<Tag>().find_many()).await.unwrap();
        assert!(all.is_empty());
    }
}
