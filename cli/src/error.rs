//! CLI error type.

use askdb::{CheckpointError, ConfigError, ResolveError, RuleStoreError, SqlError, TurnError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("rules: {0}")]
    Rules(#[from] RuleStoreError),
    #[error("references: {0}")]
    References(#[from] ResolveError),
    #[error("checkpoints: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("sql: {0}")]
    Sql(#[from] SqlError),
    #[error(transparent)]
    Turn(#[from] TurnError),
    #[error("{0} is not set")]
    MissingSetting(&'static str),
    #[error("{path} line {line}: {message}")]
    Input {
        path: String,
        line: usize,
        message: String,
    },
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
