//! Mock database clients for testing.
//!
//! `MockDatabaseClient` replays scripted results and records every query it
//! receives; `FailingDatabaseClient` fails every call like an unreachable
//! store.

use super::{DatabaseClient, QueryResult, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A query received by the mock client.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    /// The SQL text exactly as sent.
    pub sql: String,
    /// The bound parameters, in placeholder order.
    pub params: Vec<Value>,
}

/// A mock database client that returns predefined results.
///
/// Scripted results are consumed in order; once exhausted, every query
/// returns an empty result.
#[derive(Default)]
pub struct MockDatabaseClient {
    responses: Mutex<VecDeque<Result<QueryResult>>>,
    recorded: Mutex<Vec<RecordedQuery>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no scripted results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result.
    pub fn with_result(self, result: QueryResult) -> Self {
        self.push(Ok(result));
        self
    }

    /// Queues a failure.
    pub fn with_error(self, error: ReportError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, response: Result<QueryResult>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Returns every query received so far.
    pub fn recorded(&self) -> Vec<RecordedQuery> {
        self.recorded
            .lock()
            .map(|recorded| recorded.clone())
            .unwrap_or_default()
    }

    /// Returns the number of queries received so far.
    pub fn call_count(&self) -> usize {
        self.recorded.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.recorded
            .lock()
            .map_err(|_| ReportError::internal("mock recorder poisoned"))?
            .push(RecordedQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });

        let next = self
            .responses
            .lock()
            .map_err(|_| ReportError::internal("mock responses poisoned"))?
            .pop_front();

        next.unwrap_or_else(|| Ok(QueryResult::new()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A database client whose every query fails.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client that fails with the given store message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Err(ReportError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
