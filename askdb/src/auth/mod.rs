//! Row-level authorization: access rules, rule stores, the SQL AST adapter,
//! and the rewriting engine that ties them together.

mod engine;
mod rule;
pub mod sql;
mod store;

pub use engine::{AuthorizationEngine, Decision, Rewrite, DENY_ALL_PREDICATE};
pub use rule::{select_rule, AccessRule, ResourceMatcher, Specificity};
pub use sql::{SqlAdapter, SqlError};
pub use store::{InMemoryRuleStore, RuleStore, RuleStoreError, SqliteRuleStore};
