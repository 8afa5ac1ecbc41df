//! The query catalog.
//!
//! An immutable set of named analytical queries over the stop-record relation.
//! Each entry knows its SQL, the parameters it binds and the shape of its
//! result, so callers can render a report without knowing the query itself.

pub mod buckets;
mod definitions;
mod validate;

pub use validate::{placeholders, validate_definition};

use crate::error::{ReportError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Fixed row cap applied by the vehicle-log browse query.
pub const BROWSE_ROW_LIMIT: usize = 66_000;

/// A validated, optionally schema-qualified relation name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableName(String);

impl TableName {
    /// Parses `name`, accepting `table` or `schema.table` identifiers only.
    pub fn parse(name: &str) -> Result<Self> {
        static IDENT: OnceLock<Regex> = OnceLock::new();
        let re = IDENT.get_or_init(|| {
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
                .expect("identifier pattern is valid")
        });

        if re.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(ReportError::config(format!(
                "Invalid table name '{name}'. Expected an identifier such as police_stops or schema.police_stops"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self("police_stops".to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dashboard section a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    VehicleLogs,
    Violations,
    Trends,
    Overview,
    Intelligence,
    StopQuery,
    Advanced,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Self::VehicleLogs,
        Self::Violations,
        Self::Trends,
        Self::Overview,
        Self::Intelligence,
        Self::StopQuery,
        Self::Advanced,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::VehicleLogs => "Vehicle Logs",
            Self::Violations => "Violations",
            Self::Trends => "Analytics & Trends",
            Self::Overview => "Enforcement Overview",
            Self::Intelligence => "Traffic Intelligence",
            Self::StopQuery => "Police Stop Query",
            Self::Advanced => "Advanced Police Stop Analysis",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Kind of computation a report performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Row-level browse, capped.
    Browse,
    /// Single scalar value.
    ScalarKpi,
    /// Counts or averages grouped by one or more columns.
    GroupedAggregate,
    /// Filtered-count over total-count per group.
    RateAggregate,
    /// Aggregate ranked with a window function.
    RankedAggregate,
}

/// Shape of the result a report produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultShape {
    Scalar { column: &'static str },
    Table { columns: Vec<&'static str> },
}

impl ResultShape {
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar { .. })
    }

    /// Column names in projection order.
    pub fn columns(&self) -> Vec<&'static str> {
        match self {
            Self::Scalar { column } => vec![column],
            Self::Table { columns } => columns.clone(),
        }
    }
}

/// How a bound parameter is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A LIKE pattern; callers wrap the raw text with `%` delimiters.
    Substring,
    Text,
    Integer,
}

/// One entry of a query's bound-parameter schema.
///
/// The position in [`QueryDefinition::params`] is the placeholder number
/// minus one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

/// Bar-chart hint for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartHint {
    pub x: &'static str,
    pub y: &'static str,
}

/// A single named analytical query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDefinition {
    /// Stable slug used as the selection key.
    pub key: &'static str,
    /// Unique display name; also accepted by [`Catalog::get`].
    pub title: &'static str,
    pub section: Section,
    pub tier: Tier,
    pub sql: String,
    pub params: Vec<ParamSpec>,
    pub shape: ResultShape,
    pub chart: Option<ChartHint>,
}

impl QueryDefinition {
    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// The immutable catalog of report definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    table: TableName,
    entries: Vec<QueryDefinition>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Builds and validates the catalog against `table`.
    ///
    /// Fails if any definition is not a single read-only query whose
    /// placeholders and projected columns match its declaration.
    pub fn new(table: &TableName) -> Result<Self> {
        let entries = definitions::build(table);
        let mut index = HashMap::with_capacity(entries.len() * 2);

        for (i, def) in entries.iter().enumerate() {
            validate_definition(def)?;
            for name in [def.key, def.title] {
                if index.insert(name, i).is_some() {
                    return Err(ReportError::catalog(format!(
                        "duplicate catalog name '{name}'"
                    )));
                }
            }
        }

        Ok(Self {
            table: table.clone(),
            entries,
            index,
        })
    }

    /// Builds the catalog for the default `police_stops` relation.
    pub fn standard() -> Result<Self> {
        Self::new(&TableName::default())
    }

    /// Looks up a definition by key or display title.
    pub fn get(&self, name: &str) -> Result<&QueryDefinition> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ReportError::not_found(name))
    }

    /// All definitions in catalog order.
    pub fn entries(&self) -> &[QueryDefinition] {
        &self.entries
    }

    /// Definitions belonging to `section`, in catalog order.
    pub fn section(&self, section: Section) -> impl Iterator<Item = &QueryDefinition> {
        self.entries.iter().filter(move |d| d.section == section)
    }

    /// Stable keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|d| d.key)
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
