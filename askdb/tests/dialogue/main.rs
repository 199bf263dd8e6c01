//! Dialogue orchestrator integration tests: full turns through the graph with
//! a stage-aware mock LLM, a fixed entity resolver and in-memory rules.

#[path = "../init_logging.rs"]
mod init_logging;

mod answer;
mod clarification;
mod common;
mod concurrency;
mod routing;
