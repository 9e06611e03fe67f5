use crate::config::QueryGuardConfig;
use crate::data_store::{DataStore, DataStoreError, QueryResult};
use log::{debug, warn};
use sqlparser::ast::{Expr, GroupByExpr, Query, SelectItem, SetExpr, Statement, Value};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::sync::Arc;
use thiserror::Error;

const AGGREGATE_FUNCTIONS: [&str; 9] = [
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "array_agg",
    "string_agg",
    "stddev",
    "variance",
];

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Database(#[from] DataStoreError),
}

/// Outcome of running a query: the statement text actually sent and its result.
#[derive(Debug)]
pub struct Execution {
    pub sql: String,
    pub result: QueryResult,
}

/// Runs generated, passthrough and insight queries through one guarded path.
pub struct QueryExecutor {
    data_store: Arc<dyn DataStore>,
    guard: QueryGuardConfig,
}

impl QueryExecutor {
    pub fn new(data_store: Arc<dyn DataStore>, guard: QueryGuardConfig) -> Self {
        Self { data_store, guard }
    }

    pub async fn execute(&self, sql: &str) -> Result<Execution, ExecutionError> {
        let sql = self.prepare(sql)?;
        let result = self.data_store.execute(&sql, self.guard.read_only).await?;
        debug!("Query returned {} rows", result.row_count());
        Ok(Execution { sql, result })
    }

    /// Apply the configured guard to `sql`.
    ///
    /// Text that does not parse is passed on untouched; the database decides
    /// whether it is valid.
    pub fn prepare(&self, sql: &str) -> Result<String, ExecutionError> {
        if !self.guard.read_only && !self.guard.enforce_row_limit {
            return Ok(sql.to_string());
        }

        let mut statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
            Ok(statements) => statements,
            Err(e) => {
                debug!("Query not parsed locally, passing through: {}", e);
                return Ok(sql.to_string());
            }
        };

        if self.guard.read_only
            && statements
                .iter()
                .any(|statement| !matches!(statement, Statement::Query(_)))
        {
            warn!("Rejected non read-only statement: {}", sql);
            return Err(ExecutionError::Rejected(
                "Only read-only SQL statements are allowed".to_string(),
            ));
        }

        if self.guard.enforce_row_limit {
            if let [Statement::Query(query)] = statements.as_mut_slice() {
                if apply_row_limit(query, self.guard.row_limit) {
                    let limited = query.to_string();
                    debug!("Row limit applied: {}", limited);
                    return Ok(limited);
                }
            }
        }

        Ok(sql.to_string())
    }
}

/// Add `LIMIT row_limit` to a non-aggregating query that has no limit of its
/// own. Returns whether the query was changed.
fn apply_row_limit(query: &mut Query, row_limit: u64) -> bool {
    if query.limit.is_some() || query.fetch.is_some() || is_aggregating(&query.body) {
        return false;
    }
    query.limit = Some(Expr::Value(Value::Number(row_limit.to_string(), false)));
    true
}

fn is_aggregating(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => {
            let grouped = !matches!(
                &select.group_by,
                GroupByExpr::Expressions(exprs, ..) if exprs.is_empty()
            );
            grouped
                || select.having.is_some()
                || select.projection.iter().any(|item| match item {
                    SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                        contains_aggregate(expr)
                    }
                    _ => false,
                })
        }
        SetExpr::Query(query) => is_aggregating(&query.body),
        _ => false,
    }
}

fn contains_aggregate(expr: &Expr) -> bool {
    match expr {
        // A window call such as `COUNT(*) OVER ()` keeps one output row per input row.
        Expr::Function(func) if func.over.is_some() => false,
        Expr::Function(func) => {
            let name = func.name.to_string().to_lowercase();
            let name = name.rsplit('.').next().unwrap_or(&name);
            AGGREGATE_FUNCTIONS.contains(&name)
        }
        Expr::BinaryOp { left, right, .. } => contains_aggregate(left) || contains_aggregate(right),
        Expr::UnaryOp { expr, .. } | Expr::Cast { expr, .. } => contains_aggregate(expr),
        Expr::Nested(expr) => contains_aggregate(expr),
        _ => false,
    }
}
