//! Wiring: collaborators from [`AppConfig`], then the [`Orchestrator`].
//!
//! Unset database paths fall back to in-memory stores: no rules (every
//! statement denied), no reference data, conversations kept for the process
//! lifetime only.

use std::sync::Arc;

use tracing::warn;

use askdb::{
    AppConfig, ChatOpenAI, CheckpointStore, Collaborators, Embedder, EntityResolver,
    InMemoryRuleStore, MemorySaver, NoReferences, OpenAIEmbedder, Orchestrator, RuleStore,
    SqliteRuleStore, SqliteSaver, SqliteVecResolver, TurnOutput,
};

use crate::CliError;

/// Builds the orchestrator with OpenAI-compatible chat and embeddings and the
/// configured stores.
pub fn build_orchestrator(app: &AppConfig) -> Result<Orchestrator, CliError> {
    let config = app.orchestrator()?;
    let mut llm = ChatOpenAI::with_config(app.openai_config(), app.model_name());
    if let Some(t) = app.temperature {
        llm = llm.with_temperature(t);
    }
    let collaborators = Collaborators {
        llm: Arc::new(llm),
        resolver: resolver(app)?,
        rules: rule_store(app)?,
        checkpoints: checkpoint_store(app)?,
    };
    Ok(Orchestrator::new(config, collaborators)?)
}

pub fn rule_store(app: &AppConfig) -> Result<Arc<dyn RuleStore>, CliError> {
    match &app.rules_db {
        Some(path) => Ok(Arc::new(SqliteRuleStore::new(path)?)),
        None => {
            warn!("ASKDB_RULES_DB not set; every statement will be denied");
            Ok(Arc::new(InMemoryRuleStore::new()))
        }
    }
}

fn embedder(app: &AppConfig) -> Arc<dyn Embedder> {
    let mut embedder = OpenAIEmbedder::with_config(app.openai_config(), app.embedding_model_name());
    if let Some(d) = app.embedding_dimension {
        embedder = embedder.with_dimension(d);
    }
    Arc::new(embedder)
}

/// The SQLite reference index, when `ASKDB_REFERENCES_DB` is set.
pub(crate) fn reference_index(app: &AppConfig) -> Result<Option<SqliteVecResolver>, CliError> {
    let Some(path) = &app.references_db else {
        return Ok(None);
    };
    let mut index = SqliteVecResolver::new(path, embedder(app))?;
    if let Some(max) = app.max_distance {
        index = index.with_max_distance(max);
    }
    Ok(Some(index))
}

fn resolver(app: &AppConfig) -> Result<Arc<dyn EntityResolver>, CliError> {
    Ok(match reference_index(app)? {
        Some(index) => Arc::new(index),
        None => Arc::new(NoReferences),
    })
}

fn checkpoint_store(app: &AppConfig) -> Result<Arc<dyn CheckpointStore>, CliError> {
    Ok(match &app.checkpoint_db {
        Some(path) => Arc::new(SqliteSaver::new(path)?),
        None => Arc::new(MemorySaver::new()),
    })
}

/// How a turn is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// SQL, separator, explanation (or the plain message).
    Text,
    /// Reply envelope, one line.
    Json,
    /// Reply envelope, multi-line.
    PrettyJson,
}

impl OutputFormat {
    pub fn from_flags(json: bool, pretty: bool) -> Self {
        match (json, pretty) {
            (false, _) => OutputFormat::Text,
            (true, false) => OutputFormat::Json,
            (true, true) => OutputFormat::PrettyJson,
        }
    }
}

pub fn format_output(
    output: &TurnOutput,
    subject: &str,
    format: OutputFormat,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Text => output.render(),
        OutputFormat::Json => serde_json::to_string(&output.to_envelope(subject))?,
        OutputFormat::PrettyJson => serde_json::to_string_pretty(&output.to_envelope(subject))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: --json picks compact JSON unless --pretty asks for indented output.
    #[test]
    fn output_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Text);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::PrettyJson);
    }

    /// **Scenario**: Text output keeps the separator; JSON output is the reply envelope on one line.
    #[test]
    fn format_answer_text_and_json() {
        let out = TurnOutput::answer(Some("SELECT 1".into()), "one row", true);
        assert_eq!(
            format_output(&out, "alice", OutputFormat::Text).unwrap(),
            format!("SELECT 1{}one row", askdb::SEPARATOR)
        );
        let json = format_output(&out, "alice", OutputFormat::Json).unwrap();
        assert!(!json.contains('\n'));
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["type"], "FINAL_ANSWER");
        assert_eq!(v["user_id"], "alice");
        assert_eq!(v["sql_query"], "SELECT 1");
    }

    /// **Scenario**: A clarification prints as bare text, or as indented JSON with its kind.
    #[test]
    fn format_clarification_pretty() {
        let out = TurnOutput::clarification("Which day?");
        assert_eq!(format_output(&out, "alice", OutputFormat::Text).unwrap(), "Which day?");
        let json = format_output(&out, "alice", OutputFormat::PrettyJson).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("CLARIFICATION_QUESTION"));
    }

    /// **Scenario**: With no database paths the orchestrator builds on in-memory stores.
    #[test]
    fn builds_with_defaults() {
        let app = AppConfig {
            openai_api_key: Some("test-key".into()),
            ..AppConfig::default()
        };
        assert!(build_orchestrator(&app).is_ok());
    }

    /// **Scenario**: A configured SQL dialect the parser does not know fails the build.
    #[test]
    fn unknown_dialect_is_rejected() {
        let app = AppConfig {
            openai_api_key: Some("test-key".into()),
            dialect: Some("cobol".into()),
            ..AppConfig::default()
        };
        assert!(matches!(build_orchestrator(&app), Err(CliError::Turn(_))));
    }
}
