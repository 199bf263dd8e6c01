//! Rule store: read-only lookup of access rules by subject.
//!
//! Implementations: [`InMemoryRuleStore`] (tests, static setups) and
//! [`SqliteRuleStore`] (one `access_rules` table, opened per call).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use rusqlite::params;
use thiserror::Error;

use crate::auth::rule::AccessRule;

/// Error from a rule store lookup. The engine turns any of these into deny-all.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("storage: {0}")]
    Storage(String),
    #[error("lookup timed out")]
    Timeout,
}

/// Access rules keyed by subject.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All rules of `subject` in store order; empty when the subject has none.
    async fn rules_for(&self, subject: &str) -> Result<Vec<AccessRule>, RuleStoreError>;
}

/// In-memory rule store.
#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: DashMap<String, Vec<AccessRule>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = AccessRule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.insert(rule);
        }
        store
    }

    pub fn insert(&self, rule: AccessRule) {
        self.rules
            .entry(rule.subject.clone())
            .or_default()
            .push(rule);
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn rules_for(&self, subject: &str) -> Result<Vec<AccessRule>, RuleStoreError> {
        Ok(self
            .rules
            .get(subject)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

/// SQLite-backed rule store. Table `access_rules(subject, resource, predicate)`;
/// `resource` holds the written matcher form (`"R1"`, `"7*"`, `"*"`).
///
/// Uses spawn_blocking for async.
pub struct SqliteRuleStore {
    db_path: PathBuf,
}

impl SqliteRuleStore {
    /// Opens the database and ensures the table exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, RuleStoreError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS access_rules (
                id INTEGER PRIMARY KEY,
                subject TEXT NOT NULL,
                resource TEXT NOT NULL,
                predicate TEXT NOT NULL DEFAULT '',
                UNIQUE(subject, resource)
            )
            "#,
            [],
        )
        .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
        Ok(Self { db_path })
    }

    /// Inserts or replaces the rule for `(subject, resource)`.
    pub async fn put(&self, rule: &AccessRule) -> Result<(), RuleStoreError> {
        let db_path = self.db_path.clone();
        let subject = rule.subject.clone();
        let resource = rule.resource.to_string();
        let predicate = rule.predicate.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT INTO access_rules (subject, resource, predicate) VALUES (?1, ?2, ?3)
                 ON CONFLICT(subject, resource) DO UPDATE SET predicate = excluded.predicate",
                params![subject, resource, predicate],
            )
            .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
            Ok::<(), RuleStoreError>(())
        })
        .await
        .map_err(|e| RuleStoreError::Storage(e.to_string()))?
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn rules_for(&self, subject: &str) -> Result<Vec<AccessRule>, RuleStoreError> {
        let db_path = self.db_path.clone();
        let subject = subject.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
            let mut stmt = conn
                .prepare(
                    "SELECT subject, resource, predicate FROM access_rules
                     WHERE subject = ?1 ORDER BY id",
                )
                .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![subject], |row| {
                    let subject: String = row.get(0)?;
                    let resource: String = row.get(1)?;
                    let predicate: Option<String> = row.get(2)?;
                    Ok(AccessRule::new(
                        subject,
                        &resource,
                        predicate.unwrap_or_default(),
                    ))
                })
                .map_err(|e| RuleStoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| RuleStoreError::Storage(e.to_string()))
        })
        .await
        .map_err(|e| RuleStoreError::Storage(e.to_string()))?
    }
}
