//! Database abstraction layer.
//!
//! Provides a trait-based interface for running parameterized read queries,
//! so the report executor can be driven by PostgreSQL in production and by
//! an in-memory mock in tests.

mod mock;
mod postgres;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient, RecordedQuery};
pub use postgres::PostgresClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::{ConnectionConfig, ReportsConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Creates a database client for the given connection and pool settings.
///
/// This is the central factory function for backing-store connections.
pub async fn connect(
    connection: &ConnectionConfig,
    settings: &ReportsConfig,
) -> Result<Box<dyn DatabaseClient>> {
    let client = PostgresClient::connect(connection, settings).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for backing-store clients.
///
/// Parameters are always bound positionally (`$1`, `$2`, ...), never spliced
/// into the SQL text.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a SQL query with bound parameters and returns the results.
    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Closes the underlying connection pool.
    async fn close(&self) -> Result<()>;
}
