//! Static validation of catalog definitions.
//!
//! Uses sqlparser-rs with the PostgreSQL dialect to confirm that every
//! definition is exactly one read-only query, that its `$n` placeholders line
//! up with its parameter schema, and that its projection matches the declared
//! result shape.

use sqlparser::ast::{
    Expr, Query, Select, SelectItem, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::collections::BTreeSet;

use super::QueryDefinition;
use crate::error::{ReportError, Result};

/// Validates a single definition, naming it in any error.
pub fn validate_definition(def: &QueryDefinition) -> Result<()> {
    let fail = |msg: String| ReportError::catalog(format!("{}: {msg}", def.key));

    let statements = Parser::parse_sql(&PostgreSqlDialect {}, &def.sql)
        .map_err(|e| fail(format!("SQL parse error: {e}")))?;

    let query = match statements.as_slice() {
        [Statement::Query(query)] => query,
        [_] => return Err(fail("statement is not a query".to_string())),
        _ => {
            return Err(fail(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )))
        }
    };

    ensure_read_only_query(query).map_err(fail)?;

    let found = placeholders(&def.sql)?;
    let expected: BTreeSet<usize> = (1..=def.params.len()).collect();
    if found != expected {
        return Err(fail(format!(
            "placeholders {found:?} do not match {} declared parameter(s)",
            def.params.len()
        )));
    }

    if let Some(columns) = projected_columns(query).map_err(fail)? {
        let declared: Vec<String> = def.shape.columns().iter().map(|c| c.to_string()).collect();
        if columns != declared {
            return Err(fail(format!(
                "projection {columns:?} does not match declared columns {declared:?}"
            )));
        }
    }

    Ok(())
}

/// Returns the distinct positional placeholder numbers used in `sql`.
pub fn placeholders(sql: &str) -> Result<BTreeSet<usize>> {
    let tokens = Tokenizer::new(&PostgreSqlDialect {}, sql)
        .tokenize()
        .map_err(|e| ReportError::catalog(format!("SQL tokenize error: {e}")))?;

    let mut found = BTreeSet::new();
    for token in tokens {
        if let Token::Placeholder(text) = token {
            let number = text
                .strip_prefix('$')
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ReportError::catalog(format!("unsupported placeholder '{text}'"))
                })?;
            found.insert(number);
        }
    }
    Ok(found)
}

/// Rejects data-modifying constructs anywhere in the query tree.
fn ensure_read_only_query(query: &Query) -> std::result::Result<(), String> {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            ensure_read_only_query(&cte.query)?;
        }
    }
    ensure_read_only_set_expr(&query.body)
}

fn ensure_read_only_set_expr(set_expr: &SetExpr) -> std::result::Result<(), String> {
    match set_expr {
        SetExpr::Insert(_) | SetExpr::Update(_) | SetExpr::Delete(_) | SetExpr::Merge(_) => {
            Err("query contains a data-modifying statement".to_string())
        }
        SetExpr::Query(query) => ensure_read_only_query(query),
        SetExpr::Select(select) => ensure_read_only_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            ensure_read_only_set_expr(left)?;
            ensure_read_only_set_expr(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => Ok(()),
    }
}

fn ensure_read_only_select(select: &Select) -> std::result::Result<(), String> {
    select
        .from
        .iter()
        .try_for_each(ensure_read_only_table_with_joins)
}

fn ensure_read_only_table_with_joins(twj: &TableWithJoins) -> std::result::Result<(), String> {
    ensure_read_only_table_factor(&twj.relation)?;
    twj.joins
        .iter()
        .try_for_each(|join| ensure_read_only_table_factor(&join.relation))
}

fn ensure_read_only_table_factor(factor: &TableFactor) -> std::result::Result<(), String> {
    match factor {
        TableFactor::Derived { subquery, .. } => ensure_read_only_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => ensure_read_only_table_with_joins(table_with_joins),
        _ => Ok(()),
    }
}

/// Output column names of a plain SELECT body; `None` for set operations.
fn projected_columns(query: &Query) -> std::result::Result<Option<Vec<String>>, String> {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return Ok(None);
    };

    select
        .projection
        .iter()
        .map(|item| match item {
            SelectItem::ExprWithAlias { alias, .. } => Ok(alias.value.clone()),
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => Ok(ident.value.clone()),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(parts)) => parts
                .last()
                .map(|ident| ident.value.clone())
                .ok_or_else(|| "empty compound identifier".to_string()),
            SelectItem::UnnamedExpr(expr) => {
                Err(format!("projected expression '{expr}' needs an alias"))
            }
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                Err("wildcard projections are not allowed".to_string())
            }
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Some)
}
