//! Report execution.
//!
//! Turns a catalog entry plus optional bound parameters into a typed report,
//! keeping every execution independent of every other.

pub mod executor;
pub mod rate;

pub use executor::ReportExecutor;

use crate::catalog::Section;
use crate::db::{QueryResult, Value};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Named values bound into a report's placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportParams {
    values: BTreeMap<String, Value>,
}

impl ReportParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value bound exactly as given.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Adds a case-insensitive substring filter.
    ///
    /// LIKE metacharacters in `raw` are escaped, then the text is wrapped as
    /// `%raw%`. Blank input adds nothing, which leaves optional filters unset.
    pub fn contains(self, name: impl Into<String>, raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return self;
        }
        self.with(name, like_pattern(raw))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Escapes `\`, `%` and `_` and wraps the text in `%` wildcards.
pub fn like_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// A query that ran successfully but produced no rows.
///
/// This is a signal for the caller, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyResultWarning {
    pub key: String,
    pub columns: Vec<String>,
}

impl fmt::Display for EmptyResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No results found for '{}'.", self.key)
    }
}

/// The normalized outcome of one report execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ReportResult {
    /// A single count, average or rate.
    Scalar(Value),
    /// An ordered row set with named columns.
    Table(QueryResult),
    /// Zero rows.
    Empty(EmptyResultWarning),
}

/// A completed report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub key: &'static str,
    pub title: &'static str,
    pub section: Section,
    pub result: ReportResult,
    pub execution_time: Duration,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        matches!(self.result, ReportResult::Empty(_))
    }

    pub fn scalar(&self) -> Option<&Value> {
        match &self.result {
            ReportResult::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&QueryResult> {
        match &self.result {
            ReportResult::Table(table) => Some(table),
            _ => None,
        }
    }
}

/// One section of a multi-report run. Sections succeed or fail on their own.
#[derive(Debug)]
pub struct SectionReport {
    pub key: String,
    pub outcome: Result<Report>,
}

/// The four headline enforcement counts and their derived rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnforcementOverview {
    pub total_stops: i64,
    pub total_arrests: i64,
    pub total_warnings: i64,
    pub drug_related_stops: i64,
}

impl EnforcementOverview {
    pub fn arrest_rate_percent(&self) -> Option<f64> {
        rate::percent(self.total_arrests, self.total_stops)
    }

    pub fn warning_rate_percent(&self) -> Option<f64> {
        rate::percent(self.total_warnings, self.total_stops)
    }

    pub fn drug_rate_percent(&self) -> Option<f64> {
        rate::percent(self.drug_related_stops, self.total_stops)
    }
}
