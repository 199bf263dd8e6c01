//! Runtime configuration for the orchestrator and its collaborators.
//!
//! [`AppConfig::from_env`] reads `ASKDB_*` / `OPENAI_*` variables (after
//! `env_config::load_and_apply` has merged `.env` and XDG `config.toml`) and
//! [`AppConfig::orchestrator`] loads the files they point at into an
//! [`OrchestratorConfig`]. The result is passed by reference; nothing here is
//! process-global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use serde::Deserialize;

use crate::message::Message;
use crate::prompts::{self, Prompts};

pub const DEFAULT_ACCEPTED_MARKER: &str = "ok";
pub const DEFAULT_STOP_WORDS: [&str; 4] = ["stop", "cancel", "quit", "exit"];
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Error building configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("failed to read {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("seed history {path} line {line}: {message}")]
    SeedHistory {
        path: String,
        line: usize,
        message: String,
    },
    #[error(transparent)]
    Prompts(#[from] prompts::LoadError),
    #[error(transparent)]
    Env(#[from] env_config::LoadError),
}

/// Timeout per stage. Every collaborator call made by a stage is bounded by it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageTimeouts {
    /// Intent, relevance and small talk.
    pub classify: Duration,
    pub validate: Duration,
    /// Filter extraction plus entity lookup.
    pub resolve: Duration,
    pub generate: Duration,
    /// Rule lookup inside the authorization engine.
    pub authorize: Duration,
    pub comment: Duration,
    /// Checkpoint load and save.
    pub checkpoint: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            classify: Duration::from_secs(20),
            validate: Duration::from_secs(60),
            resolve: Duration::from_secs(30),
            generate: Duration::from_secs(60),
            authorize: Duration::from_secs(5),
            comment: Duration::from_secs(30),
            checkpoint: Duration::from_secs(10),
        }
    }
}

impl StageTimeouts {
    /// Same duration for every stage; handy in tests.
    pub fn uniform(d: Duration) -> Self {
        Self {
            classify: d,
            validate: d,
            resolve: d,
            generate: d,
            authorize: d,
            comment: d,
            checkpoint: d,
        }
    }
}

/// Everything the dialogue stages need besides their collaborators.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Database schema description injected into prompts.
    pub schema: String,
    /// Reference catalogue text (e.g. the divisions list) injected into prompts.
    pub reference_catalogue: String,
    /// First-line marker that accepts a validated request.
    pub accepted_marker: String,
    /// Inputs that cancel the current request (compared case-insensitively).
    pub stop_words: Vec<String>,
    /// Unscoped utterances given to intent classification.
    pub intent_history: usize,
    /// Utterances given to validation.
    pub validation_history: usize,
    pub timeouts: StageTimeouts,
    /// sqlparser dialect name for authorization rewriting.
    pub dialect: String,
    /// Example exchange prepended to every validation call.
    pub seed_history: Vec<Message>,
    pub prompts: Prompts,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            schema: String::new(),
            reference_catalogue: String::new(),
            accepted_marker: DEFAULT_ACCEPTED_MARKER.to_string(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            intent_history: 6,
            validation_history: 20,
            timeouts: StageTimeouts::default(),
            dialect: "generic".to_string(),
            seed_history: Vec::new(),
            prompts: prompts::default_from_embedded(),
        }
    }
}

impl OrchestratorConfig {
    pub fn is_stop_word(&self, input: &str) -> bool {
        let input = input.trim();
        self.stop_words
            .iter()
            .any(|w| w.trim().eq_ignore_ascii_case(input))
    }
}

/// Process-level settings: model endpoints, database paths and the files
/// backing [`OrchestratorConfig`].
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub embedding_model: Option<String>,
    pub embedding_dimension: Option<usize>,
    pub rules_db: Option<PathBuf>,
    pub references_db: Option<PathBuf>,
    pub checkpoint_db: Option<PathBuf>,
    pub max_distance: Option<f32>,
    pub schema_file: Option<PathBuf>,
    pub references_file: Option<PathBuf>,
    pub seed_history_file: Option<PathBuf>,
    pub prompts_dir: Option<PathBuf>,
    pub accepted_marker: Option<String>,
    pub stop_words: Option<Vec<String>>,
    pub intent_history: Option<usize>,
    pub validation_history: Option<usize>,
    pub dialect: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub resolve_timeout_secs: Option<u64>,
    pub authorize_timeout_secs: Option<u64>,
}

fn parse_opt<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

impl AppConfig {
    /// Loads `.env` and XDG `config.toml` for `app_name` into the process
    /// environment, then reads the configuration from it.
    pub fn load(app_name: &str, override_dir: Option<&Path>) -> Result<Self, ConfigError> {
        env_config::load_and_apply(app_name, override_dir)?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads configuration through `lookup` (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        let path = |k: &str| get(k).map(PathBuf::from);
        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            model: get("ASKDB_MODEL").or_else(|| get("OPENAI_MODEL")),
            temperature: parse_opt(&lookup, "ASKDB_TEMPERATURE")?,
            embedding_model: get("ASKDB_EMBEDDING_MODEL").or_else(|| get("EMBEDDING_MODEL")),
            embedding_dimension: parse_opt(&lookup, "ASKDB_EMBEDDING_DIMENSION")?,
            rules_db: path("ASKDB_RULES_DB"),
            references_db: path("ASKDB_REFERENCES_DB"),
            checkpoint_db: path("ASKDB_CHECKPOINT_DB"),
            max_distance: parse_opt(&lookup, "ASKDB_MAX_DISTANCE")?,
            schema_file: path("ASKDB_SCHEMA_FILE"),
            references_file: path("ASKDB_REFERENCES_FILE"),
            seed_history_file: path("ASKDB_SEED_HISTORY"),
            prompts_dir: path(prompts::PROMPTS_DIR_ENV),
            accepted_marker: get("ASKDB_ACCEPTED_MARKER").map(|m| m.trim().to_string()),
            stop_words: get("ASKDB_STOP_WORDS").map(|v| {
                v.split(',')
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect()
            }),
            intent_history: parse_opt(&lookup, "ASKDB_INTENT_HISTORY")?,
            validation_history: parse_opt(&lookup, "ASKDB_VALIDATION_HISTORY")?,
            dialect: get("ASKDB_DIALECT"),
            llm_timeout_secs: parse_opt(&lookup, "ASKDB_LLM_TIMEOUT_SECS")?,
            resolve_timeout_secs: parse_opt(&lookup, "ASKDB_RESOLVE_TIMEOUT_SECS")?,
            authorize_timeout_secs: parse_opt(&lookup, "ASKDB_AUTHORIZE_TIMEOUT_SECS")?,
        })
    }

    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Client settings for chat and embeddings; unset values fall back to the
    /// `OPENAI_*` defaults of the client library.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut config = OpenAIConfig::new();
        if let Some(key) = &self.openai_api_key {
            config = config.with_api_key(key);
        }
        if let Some(base) = &self.openai_base_url {
            config = config.with_api_base(base);
        }
        config
    }

    pub fn embedding_model_name(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    /// Reads the schema, catalogue, seed history and prompt files and builds
    /// the orchestrator settings. Unset values keep their defaults.
    pub fn orchestrator(&self) -> Result<OrchestratorConfig, ConfigError> {
        let mut config = OrchestratorConfig::default();
        if let Some(p) = &self.schema_file {
            config.schema = read_text(p)?;
        }
        if let Some(p) = &self.references_file {
            config.reference_catalogue = read_text(p)?;
        }
        if let Some(p) = &self.seed_history_file {
            config.seed_history = load_seed_history(p)?;
        }
        if let Some(dir) = &self.prompts_dir {
            config.prompts = prompts::load(Some(dir))?;
        }
        if let Some(m) = self.accepted_marker.as_ref().filter(|m| !m.is_empty()) {
            config.accepted_marker = m.clone();
        }
        if let Some(words) = &self.stop_words {
            config.stop_words = words.clone();
        }
        if let Some(n) = self.intent_history {
            config.intent_history = n;
        }
        if let Some(n) = self.validation_history {
            config.validation_history = n;
        }
        if let Some(d) = &self.dialect {
            config.dialect = d.clone();
        }
        if let Some(secs) = self.llm_timeout_secs {
            let d = Duration::from_secs(secs);
            config.timeouts.classify = d;
            config.timeouts.validate = d;
            config.timeouts.generate = d;
            config.timeouts.comment = d;
        }
        if let Some(secs) = self.resolve_timeout_secs {
            config.timeouts.resolve = Duration::from_secs(secs);
        }
        if let Some(secs) = self.authorize_timeout_secs {
            config.timeouts.authorize = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[derive(Deserialize)]
struct SeedRecord {
    #[serde(rename = "type")]
    kind: String,
    content: String,
}

/// Reads a JSONL seed history: one `{"type": "human"|"ai"|"system", "content": ...}`
/// object per line. Blank lines are skipped.
pub fn load_seed_history(path: &Path) -> Result<Vec<Message>, ConfigError> {
    let text = read_text(path)?;
    let seed_err = |line: usize, message: String| ConfigError::SeedHistory {
        path: path.display().to_string(),
        line,
        message,
    };
    let mut messages = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: SeedRecord =
            serde_json::from_str(line).map_err(|e| seed_err(idx + 1, e.to_string()))?;
        let message = match record.kind.as_str() {
            "human" | "user" => Message::user(record.content),
            "ai" | "assistant" => Message::assistant(record.content),
            "system" => Message::system(record.content),
            other => return Err(seed_err(idx + 1, format!("unknown type {:?}", other))),
        };
        messages.push(message);
    }
    Ok(messages)
}
