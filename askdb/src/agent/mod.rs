//! Dialogue orchestrator: one compiled state graph per orchestrator, one graph
//! run per user turn.
//!
//! ```text
//! start ─┬─ cancel ──────────────────────────────────────────────┐
//!        ├─ validate (resumed clarification)                     │
//!        └─ intent ─┬─ reply ────────────────────────────────────┤
//!                   └─ relevance ─┬─ reply                       │
//!                                 └─ validate ─┬─ END (question) │
//!                                              ├─ reply (failed) │
//!                                              ├─ cancel         │
//!                                              └─ resolve ─ generate_sql ─┬─ authorize ─ comment ─ END
//!                                                                         └─ comment (no SQL)
//! ```

mod context;
mod graph;
mod nodes;
mod orchestrator;

pub use orchestrator::{checkpoint_key, Clock, Collaborators, Orchestrator, TurnRequest};

/// Node ids of the dialogue graph.
pub mod node_ids {
    pub const START: &str = "start";
    pub const INTENT: &str = "intent";
    pub const RELEVANCE: &str = "relevance";
    pub const VALIDATE: &str = "validate";
    pub const RESOLVE: &str = "resolve";
    pub const GENERATE_SQL: &str = "generate_sql";
    pub const AUTHORIZE: &str = "authorize";
    pub const COMMENT: &str = "comment";
    pub const REPLY: &str = "reply";
    pub const CANCEL: &str = "cancel";
}
