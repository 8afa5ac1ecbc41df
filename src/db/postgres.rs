//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::config::{ConnectionConfig, ReportsConfig};
use crate::db::{ColumnInfo, DatabaseClient, QueryResult, Row, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgConnection, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// How long a query waits for a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL database client.
///
/// Each query acquires its own connection from the pool, so concurrent
/// reports never share a session.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    max_rows: usize,
    query_timeout: Duration,
}

impl PostgresClient {
    /// Opens a connection pool, retrying transient failures with backoff.
    ///
    /// Only pool creation is retried. Individual queries are never retried.
    pub async fn connect(config: &ConnectionConfig, settings: &ReportsConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;
        let attempts = settings.connect_attempts.max(1);

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=attempts {
            debug!("Connection attempt {} of {}", attempt, attempts);

            let result = PgPoolOptions::new()
                .max_connections(settings.max_connections.max(1))
                .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Connected to {}", config.display_string());
                    return Ok(Self::from_pool(pool, settings));
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < attempts && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, config)),
            None => Err(ReportError::internal("no connection attempt was made")),
        }
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool, settings: &ReportsConfig) -> Self {
        Self {
            pool,
            max_rows: settings.max_rows,
            query_timeout: Duration::from_secs(settings.query_timeout_secs),
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start = Instant::now();

        // The fallback describe must see the statement this call prepared,
        // so both run on the same connection.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ReportError::query(format_query_error(e)))?;

        let query = params.iter().fold(sqlx::query(sql), bind_value);

        let result = tokio::time::timeout(self.query_timeout, query.fetch_all(&mut *conn))
            .await
            .map_err(|_| {
                ReportError::query(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| ReportError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = if let Some(first_row) = result.first() {
            first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect()
        } else {
            describe_columns(&mut conn, sql).await
        };

        let total_rows = result.len();
        let was_truncated = total_rows > self.max_rows;

        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, self.max_rows
            );
        }

        let rows: Vec<Row> = result.iter().take(self.max_rows).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows: Some(total_rows),
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Column metadata for a statement, without running it.
async fn describe_columns(conn: &mut PgConnection, sql: &str) -> Vec<ColumnInfo> {
    match (&mut *conn).describe(sql).await {
        Ok(describe) => describe
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        Err(e) => {
            debug!("Could not describe statement: {e}");
            Vec::new()
        }
    }
}

/// Binds one positional parameter.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Dates and times become ISO-8601 text.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool>(row, index).map(Value::Bool),
        "INT2" | "SMALLINT" => decode::<i16>(row, index).map(|v| Value::Int(v as i64)),
        "INT4" | "INT" | "INTEGER" => decode::<i32>(row, index).map(|v| Value::Int(v as i64)),
        "INT8" | "BIGINT" => decode::<i64>(row, index).map(Value::Int),
        "FLOAT4" | "REAL" => decode::<f32>(row, index).map(|v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => decode::<f64>(row, index).map(Value::Float),
        "DATE" => decode::<NaiveDate>(row, index).map(|d| Value::String(d.to_string())),
        "TIME" => decode::<NaiveTime>(row, index).map(|t| Value::String(t.to_string())),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index)
            .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string())),
        "TIMESTAMPTZ" => {
            decode::<DateTime<Utc>>(row, index).map(|ts| Value::String(ts.to_rfc3339()))
        }
        _ => decode::<String>(row, index).map(Value::String),
    }
    .unwrap_or(Value::Null)
}

/// Reads one column. A value that cannot be decoded reads as NULL.
fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(value) => value,
        Err(e) => {
            debug!("Column {} read as NULL: {}", index, e);
            None
        }
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
        || error_str.contains("does not exist")
        || error_str.contains("ssl")
        || error_str.contains("tls")
    {
        return false;
    }

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ReportError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ReportError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        ReportError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ReportError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        ReportError::connection(
            "Server requires SSL. Add '?sslmode=require' to connection string.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ReportError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ReportError::connection(error.to_string())
    }
}

/// Formats a query error with PostgreSQL detail and hint when available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        let fields = [
            ("DETAIL", pg_error.detail()),
            ("HINT", pg_error.hint()),
            ("TABLE", pg_error.table()),
            ("COLUMN", pg_error.column()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                result.push_str(&format!("\n  {label}: {value}"));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests need a running PostgreSQL and are skipped unless
    // DATABASE_URL is set.

    async fn get_test_client() -> Option<PostgresClient> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let config = ConnectionConfig::from_connection_string(&url).ok()?;
        PostgresClient::connect(&config, &ReportsConfig::default())
            .await
            .ok()
    }

    #[test]
    fn test_transient_error_classification() {
        assert!(is_transient_error(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient_error(&sqlx::Error::Protocol(
            "password authentication failed for user \"analyst\"".to_string()
        )));
        assert!(!is_transient_error(&sqlx::Error::Protocol(
            "unexpected message".to_string()
        )));
    }

    #[test]
    fn test_connection_error_mapping() {
        let config = ConnectionConfig {
            host: Some("db.internal".to_string()),
            port: 5433,
            database: Some("stops".to_string()),
            user: Some("analyst".to_string()),
            ..Default::default()
        };

        let err = map_connection_error(sqlx::Error::PoolTimedOut, &config);
        assert_eq!(
            err,
            ReportError::connection(
                "Connection to db.internal:5433 timed out. The server may be overloaded or unreachable."
            )
        );

        let err = map_connection_error(
            sqlx::Error::Protocol("password authentication failed".to_string()),
            &config,
        );
        assert!(err.to_string().contains("user 'analyst'"));
    }

    #[tokio::test]
    async fn test_connect_to_database() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_with_bound_params() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = client
            .execute_query(
                "SELECT $1::text AS greeting, $2::int8 AS num, ($3::text IS NULL) AS missing",
                &[Value::from("hello"), Value::Int(7), Value::Null],
            )
            .await
            .unwrap();

        assert_eq!(result.column_names(), vec!["greeting", "num", "missing"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::from("hello"), Value::Int(7), Value::Bool(true)]]
        );

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_dates_and_times_decode_as_text() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = client
            .execute_query(
                "SELECT DATE '2020-01-15' AS stop_date, TIME '08:30:00' AS stop_time",
                &[],
            )
            .await
            .unwrap();

        assert_eq!(
            result.rows[0],
            vec![Value::from("2020-01-15"), Value::from("08:30:00")]
        );

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = client
            .execute_query("SELECT 1 AS num WHERE false", &[])
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.column_names(), vec!["num"]);

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_empty_statement_with_cast_params() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let table = format!("police_stops_bind_{}", std::process::id());
        client
            .execute_query(
                &format!("CREATE TABLE {table} (plate TEXT, stop_date DATE, age INTEGER)"),
                &[],
            )
            .await
            .unwrap();

        let insert = format!("INSERT INTO {table} VALUES ($1::text, $2::date, $3::int)");
        let params = [Value::from("KA01"), Value::from("2020-01-15"), Value::Int(30)];
        let mut outcomes = Vec::new();
        for _ in 0..4 {
            outcomes.push(client.execute_query(&insert, &params).await);
        }

        let count = client
            .execute_query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
            .await;
        let _ = client
            .execute_query(&format!("DROP TABLE IF EXISTS {table}"), &[])
            .await;

        for outcome in outcomes {
            assert!(outcome.unwrap().is_empty());
        }
        assert_eq!(count.unwrap().rows, vec![vec![Value::Int(4)]]);

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_column_reads_as_null() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let result = client
            .execute_query("SELECT 1.5::numeric AS ratio, 2::int4 AS n", &[])
            .await
            .unwrap();

        assert_eq!(result.rows[0], vec![Value::Null, Value::Int(2)]);

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_query_with_error() {
        let Some(client) = get_test_client().await else {
            eprintln!("Skipping test: DATABASE_URL not set");
            return;
        };

        let error = client
            .execute_query("SELECT * FROM nonexistent_table_xyz", &[])
            .await
            .unwrap_err();

        assert!(matches!(error, ReportError::QueryExecution(_)));
        assert!(error.to_string().contains("nonexistent_table_xyz"));

        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_error_messages() {
        let config = ConnectionConfig {
            host: Some("nonexistent.invalid.host".to_string()),
            port: 5432,
            database: Some("testdb".to_string()),
            user: Some("testuser".to_string()),
            password: Some("testpass".to_string()),
            sslmode: None,
        };
        let settings = ReportsConfig {
            connect_attempts: 1,
            ..Default::default()
        };

        let error = PostgresClient::connect(&config, &settings).await.unwrap_err();
        assert!(matches!(error, ReportError::Connection(_)));
    }
}
