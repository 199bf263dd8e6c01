//! Administrative commands: access rules, reference data, standalone rewrite.

use std::path::Path;

use askdb::{
    AccessRule, AppConfig, AuthorizationEngine, ReferenceEntry, Rewrite, RuleStore, SqlAdapter,
    SqliteRuleStore,
};

use crate::run::{reference_index, rule_store};
use crate::CliError;

/// Inserts or replaces the rule for `(subject, resource)` in `ASKDB_RULES_DB`.
pub async fn add_rule(app: &AppConfig, rule: &AccessRule) -> Result<(), CliError> {
    let path = app
        .rules_db
        .as_ref()
        .ok_or(CliError::MissingSetting("ASKDB_RULES_DB"))?;
    SqliteRuleStore::new(path)?.put(rule).await?;
    Ok(())
}

pub async fn list_rules(app: &AppConfig, subject: &str) -> Result<Vec<AccessRule>, CliError> {
    Ok(rule_store(app)?.rules_for(subject).await?)
}

/// Scopes `sql` for `(subject, resource)` without running a dialogue.
pub async fn rewrite(
    app: &AppConfig,
    sql: &str,
    subject: &str,
    resource: &str,
) -> Result<Rewrite, CliError> {
    let adapter = match &app.dialect {
        Some(d) => SqlAdapter::new(d.clone())?,
        None => SqlAdapter::generic(),
    };
    let engine = AuthorizationEngine::new(rule_store(app)?, adapter);
    Ok(engine.rewrite(sql, subject, resource).await)
}

/// Reads `{"key": ..., "label": ...}` objects, one per line.
pub fn read_reference_file(path: &Path) -> Result<Vec<ReferenceEntry>, CliError> {
    let text = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|e| CliError::Input {
            path: path.display().to_string(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Embeds `entries` into reference set `table` of `ASKDB_REFERENCES_DB`.
pub async fn load_references(
    app: &AppConfig,
    table: &str,
    entries: Vec<ReferenceEntry>,
) -> Result<usize, CliError> {
    let index =
        reference_index(app)?.ok_or(CliError::MissingSetting("ASKDB_REFERENCES_DB"))?;
    Ok(index.put_table(table, entries).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_rules(dir: &tempfile::TempDir) -> AppConfig {
        AppConfig {
            rules_db: Some(dir.path().join("rules.db")),
            ..AppConfig::default()
        }
    }

    /// **Scenario**: A rule added through the CLI scopes the standalone rewrite.
    #[tokio::test]
    async fn add_rule_then_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_rules(&dir);
        add_rule(&app, &AccessRule::new("A", "R1", "X in ('1','2')"))
            .await
            .unwrap();

        let r = rewrite(&app, "SELECT 1 FROM T", "A", "R1").await.unwrap();
        assert_eq!(r.sql, "SELECT 1 FROM T WHERE X IN ('1', '2')");
        assert!(r.applied);

        let rules = list_rules(&app, "A").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].predicate, "X in ('1','2')");
    }

    /// **Scenario**: Without a rules database every statement is denied and rules cannot be added.
    #[tokio::test]
    async fn no_rules_db_denies() {
        let app = AppConfig::default();
        let r = rewrite(&app, "SELECT 1 FROM T", "A", "R1").await.unwrap();
        assert_eq!(r.sql, "SELECT 1 FROM T WHERE 1 = 0");
        assert!(matches!(
            add_rule(&app, &AccessRule::new("A", "*", "")).await,
            Err(CliError::MissingSetting("ASKDB_RULES_DB"))
        ));
    }

    /// **Scenario**: Blank lines between reference records are skipped.
    #[test]
    fn read_reference_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("divisions.jsonl");
        std::fs::write(
            &path,
            "{\"key\": \"7001\", \"label\": \"North\"}\n\n{\"key\": \"7002\", \"label\": \"South\"}\n",
        )
        .unwrap();
        let entries = read_reference_file(&path).unwrap();
        assert_eq!(
            entries,
            vec![
                ReferenceEntry::new("7001", "North"),
                ReferenceEntry::new("7002", "South")
            ]
        );
    }

    /// **Scenario**: A malformed record is reported with its 1-based line number.
    #[test]
    fn read_reference_file_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"key\": \"1\", \"label\": \"a\"}\nnot json\n").unwrap();
        match read_reference_file(&path) {
            Err(CliError::Input { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other.map(|e| e.len())),
        }
    }
}
