//! Conversation state persisted per conversation key, and the per-turn graph state.
//!
//! [`ConversationState`] is what the checkpoint store saves. [`TurnState`] wraps
//! it with the input and the intermediate outcomes of one turn; it flows through
//! the dialogue graph nodes and is discarded once the turn's output is built.

mod outcome;

pub use outcome::{GenerationOutcome, Intent, Relevance, ReplyKind, ValidationOutcome};

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::output::TurnOutput;
use crate::resolve::ResolvedEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: Role,
    pub text: String,
    /// Assistant output that carries an authorization-scoped statement.
    /// Such entries are never fed back to intent classification.
    #[serde(default)]
    pub scoped: bool,
}

impl Utterance {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            scoped: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            scoped: false,
        }
    }

    pub fn scoped_assistant(text: impl Into<String>) -> Self {
        Self {
            scoped: true,
            ..Self::assistant(text)
        }
    }

    pub fn to_message(&self) -> Message {
        match self.role {
            Role::User => Message::user(self.text.clone()),
            Role::Assistant => Message::assistant(self.text.clone()),
        }
    }
}

/// Suspended clarification sub-dialogue: the question/answer exchange so far.
///
/// Lives outside `turns` until the sub-dialogue accepts, cancels or fails;
/// then the whole exchange is appended at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClarification {
    pub exchange: Vec<Utterance>,
    pub rounds: u32,
}

/// State of one conversation (subject + conversation key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub subject: String,
    pub resource: String,
    pub turns: Vec<Utterance>,
    pub clarification: Option<PendingClarification>,
    pub pending_instruction: Option<String>,
    pub resolved_filters: BTreeMap<String, ResolvedEntity>,
    pub draft_sql: Option<String>,
    pub final_sql: Option<String>,
    pub restriction_applied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(subject: impl Into<String>, resource: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subject: subject.into(),
            resource: resource.into(),
            turns: Vec::new(),
            clarification: None,
            pending_instruction: None,
            resolved_filters: BTreeMap::new(),
            draft_sql: None,
            final_sql: None,
            restriction_applied: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_awaiting_clarification(&self) -> bool {
        self.clarification.is_some()
    }

    /// Clears the fields produced by the previous request before a new validation.
    pub fn reset_request(&mut self) {
        self.pending_instruction = None;
        self.resolved_filters.clear();
        self.draft_sql = None;
        self.final_sql = None;
        self.restriction_applied = false;
    }

    /// Appends a suspended exchange (if any) to `turns` and clears the suspend point.
    pub fn commit_clarification(&mut self) {
        if let Some(pending) = self.clarification.take() {
            self.turns.extend(pending.exchange);
        }
    }

    /// Last `n` utterances that do not carry a scoped statement, oldest first.
    pub fn recent_unscoped(&self, n: usize) -> Vec<&Utterance> {
        let mut recent: Vec<&Utterance> =
            self.turns.iter().rev().filter(|u| !u.scoped).take(n).collect();
        recent.reverse();
        recent
    }

    /// Last `n` utterances, oldest first.
    pub fn recent(&self, n: usize) -> &[Utterance] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

/// Graph state for one turn.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub conversation: ConversationState,
    /// Raw inbound utterance.
    pub input: String,
    /// Set by `start` when the input is a stop signal or empty.
    pub cancel_requested: bool,
    /// Set by `start` when the input answers a pending clarifying question.
    pub resumed: bool,
    pub intent: Option<Intent>,
    pub relevance: Option<Relevance>,
    pub validation: Option<ValidationOutcome>,
    pub generation: Option<GenerationOutcome>,
    pub reply: Option<ReplyKind>,
    pub output: Option<TurnOutput>,
    /// Local calendar date the turn runs on; fills date placeholders in prompts.
    pub today: NaiveDate,
}

impl TurnState {
    pub fn new(conversation: ConversationState, input: impl Into<String>) -> Self {
        Self {
            conversation,
            input: input.into(),
            cancel_requested: false,
            resumed: false,
            intent: None,
            relevance: None,
            validation: None,
            generation: None,
            reply: None,
            output: None,
            today: Local::now().date_naive(),
        }
    }

    /// Records the turn's output and appends it to the history.
    pub fn finish(&mut self, output: TurnOutput) {
        let text = output.render();
        let utterance = if output.final_sql.is_some() {
            Utterance::scoped_assistant(text)
        } else {
            Utterance::assistant(text)
        };
        self.conversation.turns.push(utterance);
        self.output = Some(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Scoped assistant entries are skipped by recent_unscoped; order is oldest first.
    #[test]
    fn recent_unscoped_skips_scoped_entries() {
        let mut c = ConversationState::new("A", "R1");
        c.turns.push(Utterance::user("q1"));
        c.turns.push(Utterance::scoped_assistant("SELECT 1\n===\nok"));
        c.turns.push(Utterance::user("hi"));
        c.turns.push(Utterance::assistant("hello"));
        let texts: Vec<_> = c.recent_unscoped(2).iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "hello"]);
        let all: Vec<_> = c.recent_unscoped(10).iter().map(|u| u.text.as_str()).collect();
        assert_eq!(all, vec!["q1", "hi", "hello"]);
        assert_eq!(c.recent(1)[0].text, "hello");
    }

    /// **Scenario**: Committing a clarification appends the exchange once and clears the slot.
    #[test]
    fn commit_clarification_appends_exchange() {
        let mut c = ConversationState::new("A", "R1");
        c.clarification = Some(PendingClarification {
            exchange: vec![Utterance::assistant("which year?"), Utterance::user("2024")],
            rounds: 1,
        });
        c.commit_clarification();
        assert!(c.clarification.is_none());
        assert_eq!(c.turns.len(), 2);
        c.commit_clarification();
        assert_eq!(c.turns.len(), 2);
    }

    /// **Scenario**: State survives a JSON round trip (checkpoint payload format).
    #[test]
    fn conversation_state_json_round_trip() {
        let mut c = ConversationState::new("A", "R1");
        c.turns.push(Utterance::user("q"));
        c.pending_instruction = Some("show revenue".into());
        let json = serde_json::to_string(&c).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
