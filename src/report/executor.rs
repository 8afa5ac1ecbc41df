//! Report execution against the backing store.
//!
//! Binds parameters by position, runs the catalog SQL once, and normalizes the
//! rows into a [`ReportResult`]. Failures are scoped to the single request:
//! nothing is retried and no partial result is returned.

use std::time::Instant;

use tracing::{debug, error, warn};

use super::{
    EmptyResultWarning, EnforcementOverview, Report, ReportParams, ReportResult, SectionReport,
};
use crate::catalog::{Catalog, ParamKind, QueryDefinition, ResultShape};
use crate::db::{DatabaseClient, QueryResult, Value};
use crate::error::{ReportError, Result};

/// Executes catalog reports against a database client.
pub struct ReportExecutor<'a> {
    db: &'a dyn DatabaseClient,
    catalog: &'a Catalog,
}

impl<'a> ReportExecutor<'a> {
    /// Creates a new report executor.
    pub fn new(db: &'a dyn DatabaseClient, catalog: &'a Catalog) -> Self {
        Self { db, catalog }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Looks up `key` and runs it. Unknown keys fail before any query is sent.
    pub async fn run_key(&self, key: &str, params: &ReportParams) -> Result<Report> {
        let definition = self.catalog.get(key)?;
        self.run(definition, params).await
    }

    /// Runs a single definition with the given parameters.
    pub async fn run(&self, definition: &QueryDefinition, params: &ReportParams) -> Result<Report> {
        let bound = bind_params(definition, params)?;

        debug!(
            key = definition.key,
            params = bound.len(),
            "Running report"
        );

        let start = Instant::now();
        let result = self
            .db
            .execute_query(&definition.sql, &bound)
            .await
            .map_err(|e| {
                error!(key = definition.key, "Report failed: {e}");
                as_execution_error(e)
            })?;
        let execution_time = start.elapsed();

        if let Some(warning) = result.truncation_warning() {
            warn!(key = definition.key, "{warning}");
        }

        let result = normalize(definition, result);
        if let ReportResult::Empty(warning) = &result {
            warn!(key = definition.key, "{warning}");
        } else {
            debug!(
                key = definition.key,
                elapsed_ms = execution_time.as_millis() as u64,
                "Report finished"
            );
        }

        Ok(Report {
            key: definition.key,
            title: definition.title,
            section: definition.section,
            result,
            execution_time,
        })
    }

    /// Runs several reports in order. A failure in one section leaves the
    /// others untouched.
    pub async fn run_sections(&self, requests: &[(&str, ReportParams)]) -> Vec<SectionReport> {
        let mut sections = Vec::with_capacity(requests.len());
        for (key, params) in requests {
            let outcome = self.run_key(key, params).await;
            sections.push(SectionReport {
                key: key.to_string(),
                outcome,
            });
        }
        sections
    }

    /// Runs the four enforcement KPIs.
    pub async fn overview(&self) -> Result<EnforcementOverview> {
        let none = ReportParams::new();
        Ok(EnforcementOverview {
            total_stops: self.count("total-stops", &none).await?,
            total_arrests: self.count("total-arrests", &none).await?,
            total_warnings: self.count("total-warnings", &none).await?,
            drug_related_stops: self.count("drug-related-stops", &none).await?,
        })
    }

    async fn count(&self, key: &str, params: &ReportParams) -> Result<i64> {
        let report = self.run_key(key, params).await?;
        report
            .scalar()
            .and_then(Value::as_i64)
            .ok_or_else(|| ReportError::internal(format!("'{key}' did not return a count")))
    }
}

/// Orders `params` by the definition's placeholder schema.
///
/// Unknown names, missing required values and type mismatches are rejected.
/// Absent optional parameters are bound as NULL.
fn bind_params(definition: &QueryDefinition, params: &ReportParams) -> Result<Vec<Value>> {
    if let Some(unknown) = params.names().find(|name| definition.param(name).is_none()) {
        return Err(ReportError::invalid_parameter(format!(
            "'{}' does not accept parameter '{unknown}'",
            definition.key
        )));
    }

    definition
        .params
        .iter()
        .map(|spec| {
            let value = params.get(spec.name).cloned().unwrap_or_default();
            let accepted = match (&value, spec.kind) {
                (Value::Null, _) => !spec.required,
                (Value::String(_), ParamKind::Substring | ParamKind::Text) => true,
                (Value::Int(_), ParamKind::Integer) => true,
                _ => false,
            };
            if accepted {
                Ok(value)
            } else if value.is_null() {
                Err(ReportError::invalid_parameter(format!(
                    "'{}' requires parameter '{}'",
                    definition.key, spec.name
                )))
            } else {
                Err(ReportError::invalid_parameter(format!(
                    "parameter '{}' of '{}' expects {:?}, got {}",
                    spec.name,
                    definition.key,
                    spec.kind,
                    value.type_name()
                )))
            }
        })
        .collect()
}

fn as_execution_error(error: ReportError) -> ReportError {
    match error {
        ReportError::QueryExecution(_) => error,
        other => ReportError::query(other.to_string()),
    }
}

fn normalize(definition: &QueryDefinition, result: QueryResult) -> ReportResult {
    if result.is_empty() {
        let columns = if result.columns.is_empty() {
            definition
                .shape
                .columns()
                .into_iter()
                .map(String::from)
                .collect()
        } else {
            result.column_names().into_iter().map(String::from).collect()
        };
        return ReportResult::Empty(EmptyResultWarning {
            key: definition.key.to_string(),
            columns,
        });
    }

    match &definition.shape {
        ResultShape::Scalar { column } => {
            let value = result
                .get(0, column)
                .or_else(|| result.first_value())
                .cloned()
                .unwrap_or_default();
            ReportResult::Scalar(value)
        }
        ResultShape::Table { .. } => ReportResult::Table(result),
    }
}
