//! Authorization rewriting engine: scope a generated statement to the rows a
//! subject may see.
//!
//! Policy resolution fails closed (no rule, broken rule, unreachable store all
//! become the deny-all predicate). Statement parsing fails open: an unparsable
//! statement is returned unchanged with `applied = false`, never patched as text.

use std::sync::Arc;
use std::time::Duration;

use sqlparser::ast::{BinaryOperator, Expr, Value};
use tracing::{debug, warn};

use crate::auth::rule::{select_rule, ResourceMatcher};
use crate::auth::sql::{conjoin_where, SqlAdapter};
use crate::auth::store::{RuleStore, RuleStoreError};

/// Condition that never matches a row.
pub const DENY_ALL_PREDICATE: &str = "1 = 0";

/// How the applied predicate was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The most specific matching rule was applied.
    Rule(ResourceMatcher),
    /// The winning rule has an empty predicate: statement left unchanged.
    Unrestricted(ResourceMatcher),
    /// The subject has no rule covering the resource.
    NoMatchingRule,
    /// The winning rule's predicate did not parse as a boolean expression.
    InvalidPredicate(ResourceMatcher),
    /// The rule store failed or timed out.
    StoreUnavailable,
    /// No subject given; nothing could be resolved.
    MissingSubject,
    /// The statement did not parse as a single query, or has a top-level
    /// branch (`TABLE`, `VALUES`) with no WHERE clause to restrict.
    UnparsableStatement,
}

impl Decision {
    pub fn is_deny_all(&self) -> bool {
        matches!(
            self,
            Decision::NoMatchingRule | Decision::InvalidPredicate(_) | Decision::StoreUnavailable
        )
    }
}

/// Result of [`AuthorizationEngine::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub sql: String,
    /// True when a rule decision (including deny-all or an unrestricted grant) was enforced.
    pub applied: bool,
    pub decision: Decision,
}

enum Policy {
    Unrestricted(ResourceMatcher),
    Restrict(Expr, Decision),
}

/// Resolves the best rule for `(subject, resource)` and enforces it on a statement.
///
/// **Interaction**: Used by the `authorize` dialogue stage; also exposed on the CLI
/// as a standalone rewrite.
pub struct AuthorizationEngine {
    rules: Arc<dyn RuleStore>,
    sql: SqlAdapter,
    lookup_timeout: Option<Duration>,
}

impl AuthorizationEngine {
    pub fn new(rules: Arc<dyn RuleStore>, sql: SqlAdapter) -> Self {
        Self {
            rules,
            sql,
            lookup_timeout: None,
        }
    }

    /// Bounds each rule store lookup; expiry counts as store failure (deny-all).
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    pub fn sql(&self) -> &SqlAdapter {
        &self.sql
    }

    /// `rewrite(sql, subject, resource) -> (finalSQL, applied)` with the decision attached.
    pub async fn rewrite(&self, sql: &str, subject: &str, resource: &str) -> Rewrite {
        if subject.trim().is_empty() {
            warn!(resource = %resource, "no subject for authorization; statement left unscoped");
            return Rewrite {
                sql: sql.to_string(),
                applied: false,
                decision: Decision::MissingSubject,
            };
        }

        let (predicate, decision) = match self.policy(subject, resource).await {
            Policy::Unrestricted(matcher) => {
                debug!(subject = %subject, resource = %resource, rule = %matcher, "unrestricted grant");
                return Rewrite {
                    sql: sql.to_string(),
                    applied: true,
                    decision: Decision::Unrestricted(matcher),
                };
            }
            Policy::Restrict(predicate, decision) => (predicate, decision),
        };

        let mut statement = match self.sql.parse_query(sql) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "generated statement did not parse; left unscoped");
                return Rewrite {
                    sql: sql.to_string(),
                    applied: false,
                    decision: Decision::UnparsableStatement,
                };
            }
        };
        if let Err(e) = conjoin_where(&mut statement, &predicate) {
            warn!(error = %e, "generated statement cannot be restricted; left unscoped");
            return Rewrite {
                sql: sql.to_string(),
                applied: false,
                decision: Decision::UnparsableStatement,
            };
        }
        debug!(subject = %subject, resource = %resource, decision = ?decision, "statement scoped");
        Rewrite {
            sql: statement.to_string(),
            applied: true,
            decision,
        }
    }

    async fn policy(&self, subject: &str, resource: &str) -> Policy {
        let rules = match self.lookup(subject).await {
            Ok(r) => r,
            Err(e) => {
                warn!(subject = %subject, error = %e, "rule store unavailable; denying all rows");
                return self.deny_all(Decision::StoreUnavailable);
            }
        };
        let Some(rule) = select_rule(&rules, resource) else {
            debug!(subject = %subject, resource = %resource, "no matching rule; denying all rows");
            return self.deny_all(Decision::NoMatchingRule);
        };
        if rule.is_unrestricted() {
            return Policy::Unrestricted(rule.resource.clone());
        }
        match self.sql.parse_predicate(&rule.predicate) {
            Ok(expr) => Policy::Restrict(expr, Decision::Rule(rule.resource.clone())),
            Err(e) => {
                warn!(
                    subject = %subject,
                    rule = %rule.resource,
                    error = %e,
                    "rule predicate invalid; denying all rows"
                );
                self.deny_all(Decision::InvalidPredicate(rule.resource.clone()))
            }
        }
    }

    async fn lookup(
        &self,
        subject: &str,
    ) -> Result<Vec<crate::auth::rule::AccessRule>, RuleStoreError> {
        match self.lookup_timeout {
            Some(limit) => tokio::time::timeout(limit, self.rules.rules_for(subject))
                .await
                .map_err(|_| RuleStoreError::Timeout)?,
            None => self.rules.rules_for(subject).await,
        }
    }

    fn deny_all(&self, decision: Decision) -> Policy {
        Policy::Restrict(deny_all_expr(), decision)
    }
}

/// [`DENY_ALL_PREDICATE`] as an expression.
fn deny_all_expr() -> Expr {
    Expr::BinaryOp {
        left: Box::new(Expr::Value(Value::Number("1".into(), false))),
        op: BinaryOperator::Eq,
        right: Box::new(Expr::Value(Value::Number("0".into(), false))),
    }
}
