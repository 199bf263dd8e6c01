//! Shared collaborators and helpers for the stage nodes.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::auth::AuthorizationEngine;
use crate::config::OrchestratorConfig;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::resolve::EntityResolver;

/// What every stage may use. Built once per orchestrator.
pub(crate) struct StageContext {
    pub llm: Arc<dyn LlmClient>,
    pub resolver: Arc<dyn EntityResolver>,
    pub auth: AuthorizationEngine,
    pub config: OrchestratorConfig,
}

impl StageContext {
    /// One completion bounded by `limit`. Errors and timeouts come back as a
    /// reason string; the caller picks its sentinel.
    pub async fn ask(
        &self,
        stage: &'static str,
        limit: Duration,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<String, String> {
        bounded(stage, limit, self.llm.complete(system_prompt, messages)).await
    }
}

/// Runs a collaborator call under `tokio::time::timeout`; failures are logged
/// at `warn` and flattened to a reason.
pub(crate) async fn bounded<T, E, F>(stage: &'static str, limit: Duration, fut: F) -> Result<T, String>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => {
            tracing::warn!(stage, error = %e, "collaborator failed");
            Err(e.to_string())
        }
        Err(_) => {
            tracing::warn!(stage, timeout_ms = limit.as_millis() as u64, "collaborator timed out");
            Err(format!("{} timed out after {:?}", stage, limit))
        }
    }
}

/// `YYYYMMDD` for `today` and the day before.
pub(crate) fn date_vars(today: NaiveDate) -> (String, String) {
    let yesterday = today.pred_opt().unwrap_or(today);
    (
        today.format("%Y%m%d").to_string(),
        yesterday.format("%Y%m%d").to_string(),
    )
}
