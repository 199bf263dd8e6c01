//! SQL AST adapter: parse a generated statement, conjoin a filter into its
//! WHERE clauses, and print it back.
//!
//! Built on `sqlparser`; output is its `Display` form, so identical input
//! always renders identically and identifier quoting is kept as written.

use sqlparser::ast::{BinaryOperator, Expr, Query, Select, SetExpr, Statement, Value};
use sqlparser::dialect::{dialect_from_str, Dialect};
use sqlparser::parser::Parser;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("unknown sql dialect: {0}")]
    UnknownDialect(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("expected exactly one query statement, found {0}")]
    NotASingleQuery(String),
    #[error("not a boolean expression: {0}")]
    NotABooleanExpression(String),
    #[error("query body cannot be restricted: {0}")]
    Unrestrictable(String),
}

/// Parser front end bound to one dialect name (`generic`, `postgresql`, `mysql`, ...).
///
/// Holds the name rather than the dialect object so the adapter stays `Send + Sync`.
#[derive(Debug, Clone)]
pub struct SqlAdapter {
    dialect: String,
}

impl SqlAdapter {
    pub fn new(dialect: impl Into<String>) -> Result<Self, SqlError> {
        let dialect = dialect.into();
        if dialect_from_str(&dialect).is_none() {
            return Err(SqlError::UnknownDialect(dialect));
        }
        Ok(Self { dialect })
    }

    pub fn generic() -> Self {
        Self {
            dialect: "generic".to_string(),
        }
    }

    fn dialect(&self) -> Result<Box<dyn Dialect>, SqlError> {
        dialect_from_str(&self.dialect).ok_or_else(|| SqlError::UnknownDialect(self.dialect.clone()))
    }

    /// Parses `sql` as exactly one query (SELECT, set operation, WITH ... SELECT).
    pub fn parse_query(&self, sql: &str) -> Result<Statement, SqlError> {
        let dialect = self.dialect()?;
        let mut statements =
            Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| SqlError::Parse(e.to_string()))?;
        if statements.len() != 1 {
            return Err(SqlError::NotASingleQuery(format!(
                "{} statements",
                statements.len()
            )));
        }
        let statement = statements.remove(0);
        match statement {
            Statement::Query(_) => Ok(statement),
            other => Err(SqlError::NotASingleQuery(other.to_string())),
        }
    }

    /// Parses `predicate` in isolation as one boolean expression.
    ///
    /// The text must survive as the whole WHERE clause of `SELECT 1 WHERE <predicate>`:
    /// trailing clauses, extra statements or set operations are rejected.
    pub fn parse_predicate(&self, predicate: &str) -> Result<Expr, SqlError> {
        let wrapped = format!("SELECT 1 WHERE {}", predicate.trim());
        let statement = self.parse_query(&wrapped)?;
        let selection = match &statement {
            Statement::Query(q) => match q.body.as_ref() {
                SetExpr::Select(select) => select.selection.clone(),
                _ => None,
            },
            _ => None,
        };
        let expr = selection
            .ok_or_else(|| SqlError::NotABooleanExpression(predicate.to_string()))?;
        if statement.to_string() != format!("SELECT 1 WHERE {}", expr) {
            return Err(SqlError::NotABooleanExpression(predicate.to_string()));
        }
        if !is_boolean_shaped(&expr) {
            return Err(SqlError::NotABooleanExpression(predicate.to_string()));
        }
        Ok(expr)
    }
}

/// Rejects bare literals that can never be a row condition (`'abc'`, `42`, `NULL`).
fn is_boolean_shaped(expr: &Expr) -> bool {
    match expr {
        Expr::Nested(inner) => is_boolean_shaped(inner),
        Expr::Value(Value::Boolean(_)) => true,
        Expr::Value(_) => false,
        _ => true,
    }
}

/// Conjoins `predicate` into the WHERE clause of every SELECT of the statement's
/// top-level query body (both sides of UNION/INTERSECT/EXCEPT included).
///
/// An existing WHERE becomes `(<existing>) AND (<predicate>)`; a missing one
/// becomes `<predicate>`. CTE bodies and derived tables are left as written.
///
/// Any top-level branch without a WHERE clause to extend (`TABLE t`,
/// `VALUES (...)`, DML bodies) is an error; on error the statement may be
/// partially modified and must be discarded.
pub fn conjoin_where(statement: &mut Statement, predicate: &Expr) -> Result<(), SqlError> {
    match statement {
        Statement::Query(query) => conjoin_query(query, predicate),
        other => Err(SqlError::NotASingleQuery(other.to_string())),
    }
}

fn conjoin_query(query: &mut Query, predicate: &Expr) -> Result<(), SqlError> {
    conjoin_set_expr(&mut query.body, predicate)
}

fn conjoin_set_expr(body: &mut SetExpr, predicate: &Expr) -> Result<(), SqlError> {
    match body {
        SetExpr::Select(select) => {
            conjoin_select(select, predicate);
            Ok(())
        }
        SetExpr::Query(query) => conjoin_query(query, predicate),
        SetExpr::SetOperation { left, right, .. } => {
            conjoin_set_expr(left, predicate)?;
            conjoin_set_expr(right, predicate)
        }
        other => Err(SqlError::Unrestrictable(other.to_string())),
    }
}

fn conjoin_select(select: &mut Select, predicate: &Expr) {
    select.selection = Some(match select.selection.take() {
        None => predicate.clone(),
        Some(existing) => Expr::BinaryOp {
            left: Box::new(nested(existing)),
            op: BinaryOperator::And,
            right: Box::new(nested(predicate.clone())),
        },
    });
}

fn nested(expr: Expr) -> Expr {
    match expr {
        Expr::Nested(_) => expr,
        other => Expr::Nested(Box::new(other)),
    }
}

/// WHERE clause of the first SELECT in the statement's query body.
#[cfg(test)]
pub(crate) fn top_level_selection(statement: &Statement) -> Option<&Expr> {
    fn from_set_expr(body: &SetExpr) -> Option<&Expr> {
        match body {
            SetExpr::Select(select) => select.selection.as_ref(),
            SetExpr::Query(query) => from_set_expr(&query.body),
            SetExpr::SetOperation { left, .. } => from_set_expr(left),
            _ => None,
        }
    }
    match statement {
        Statement::Query(query) => from_set_expr(&query.body),
        _ => None,
    }
}
