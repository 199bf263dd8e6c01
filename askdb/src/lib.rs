//! # askdb
//!
//! Natural-language questions in, authorized SQL out. A multi-turn dialogue
//! validates the request (asking clarifying questions when needed), resolves
//! named entities against reference tables, drafts a SQL statement and scopes
//! it to the caller's row-level access rules before explaining it.
//!
//! ## Main modules
//!
//! - [`agent`]: [`Orchestrator`], the dialogue state machine; one [`Orchestrator::run`] per user turn.
//! - [`auth`]: [`AuthorizationEngine`] and its [`RuleStore`]s; [`auth::sql`] rewrites the statement AST.
//! - [`resolve`]: [`EntityResolver`] over embeddings ([`InMemoryReferenceIndex`], [`SqliteVecResolver`]).
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], OpenAI-compatible [`ChatOpenAI`].
//! - [`memory`]: [`CheckpointStore`] for conversation state ([`MemorySaver`], [`SqliteSaver`]).
//! - [`graph`]: [`StateGraph`] / [`CompiledStateGraph`], nodes with conditional edges and middleware.
//! - [`state`]: [`ConversationState`] (persisted) and [`TurnState`] (one graph run).
//! - [`output`]: [`TurnOutput`] and its text / JSON forms.
//! - [`config`]: [`AppConfig`] from the environment, [`OrchestratorConfig`] for the stages.
//! - [`prompts`]: stage prompt templates, embedded YAML with directory overrides.

pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod output;
pub mod prompts;
pub mod resolve;
pub mod state;

pub use agent::{checkpoint_key, Clock, Collaborators, Orchestrator, TurnRequest};
pub use auth::{
    AccessRule, AuthorizationEngine, Decision, InMemoryRuleStore, ResourceMatcher, Rewrite,
    RuleStore, RuleStoreError, SqlAdapter, SqlError, SqliteRuleStore, DENY_ALL_PREDICATE,
};
pub use config::{AppConfig, ConfigError, OrchestratorConfig, StageTimeouts};
pub use error::{AgentError, TurnError};
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, END, START};
pub use llm::{ChatOpenAI, LlmClient, LlmError, LlmResponse, MockLlm};
pub use memory::{CheckpointError, CheckpointStore, MemorySaver, SqliteSaver};
pub use message::Message;
pub use output::{TurnKind, TurnOutput, SEPARATOR};
pub use prompts::Prompts;
pub use resolve::{
    Embedder, EntityResolver, InMemoryReferenceIndex, NoReferences, OpenAIEmbedder,
    ReferenceEntry, ResolveError, ResolvedEntity, SqliteVecResolver,
};
pub use state::{ConversationState, TurnState, Utterance};
