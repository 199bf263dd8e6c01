//! Turn output contract.
//!
//! A turn always yields a SQL part (possibly absent) and an explanation. The
//! text form joins them with [`SEPARATOR`]; consumers split on its first
//! occurrence. The JSON form mirrors the message-queue reply
//! (`FINAL_ANSWER` / `CLARIFICATION_QUESTION`).

use serde::{Deserialize, Serialize};

/// Separator between the SQL part and the explanation in rendered output.
pub const SEPARATOR: &str = "\n===\n";

/// What kind of turn just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// SQL pipeline ran to the end (SQL may still be absent if drafting failed).
    Answer,
    /// Waiting for the answer to a clarifying question.
    Clarification,
    /// The user stopped the dialogue.
    Cancelled,
    /// Small talk, refusal or failure message; no SQL pipeline.
    Reply,
}

/// Externally visible result of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutput {
    pub kind: TurnKind,
    pub final_sql: Option<String>,
    pub explanation: String,
    pub restriction_applied: bool,
}

impl TurnOutput {
    pub fn answer(final_sql: Option<String>, explanation: impl Into<String>, applied: bool) -> Self {
        Self {
            kind: TurnKind::Answer,
            final_sql,
            explanation: explanation.into(),
            restriction_applied: applied,
        }
    }

    pub fn clarification(question: impl Into<String>) -> Self {
        Self::text(TurnKind::Clarification, question)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::text(TurnKind::Cancelled, message)
    }

    pub fn reply(message: impl Into<String>) -> Self {
        Self::text(TurnKind::Reply, message)
    }

    fn text(kind: TurnKind, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            final_sql: None,
            explanation: explanation.into(),
            restriction_applied: false,
        }
    }

    pub fn is_clarification_pending(&self) -> bool {
        self.kind == TurnKind::Clarification
    }

    /// Text form. Answers always carry the separator, even without SQL.
    pub fn render(&self) -> String {
        match (&self.kind, &self.final_sql) {
            (TurnKind::Answer, sql) => format!(
                "{}{}{}",
                sql.as_deref().unwrap_or_default(),
                SEPARATOR,
                self.explanation
            ),
            (_, _) => self.explanation.clone(),
        }
    }

    /// Splits a rendered answer at the first separator: `(sql, explanation)`.
    /// Text without a separator is all explanation.
    pub fn split(rendered: &str) -> (Option<&str>, &str) {
        match rendered.split_once(SEPARATOR) {
            Some((sql, explanation)) => {
                let sql = sql.trim();
                ((!sql.is_empty()).then_some(sql), explanation)
            }
            None => (None, rendered),
        }
    }

    /// Reply envelope for transports: `FINAL_ANSWER` with `sql_query`/`comment`,
    /// or `CLARIFICATION_QUESTION` with `question`.
    pub fn to_envelope(&self, user_id: &str) -> serde_json::Value {
        match self.kind {
            TurnKind::Answer => serde_json::json!({
                "type": "FINAL_ANSWER",
                "user_id": user_id,
                "sql_query": self.final_sql,
                "comment": self.explanation,
                "restriction_applied": self.restriction_applied,
            }),
            TurnKind::Clarification | TurnKind::Cancelled | TurnKind::Reply => serde_json::json!({
                "type": "CLARIFICATION_QUESTION",
                "user_id": user_id,
                "kind": self.kind,
                "question": self.explanation,
            }),
        }
    }
}
