//! Graph compilation error.

use thiserror::Error;

/// Returned by `StateGraph::compile` when the wiring is inconsistent.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// An edge or router references an id never registered with `add_node`.
    #[error("node not found: {0}")]
    NodeNotFound(String),
    /// No edge leaves START.
    #[error("graph must have exactly one edge from START")]
    MissingStart,
    /// Nothing reaches END.
    #[error("graph must have at least one path to END")]
    MissingEnd,
    #[error("invalid graph wiring: {0}")]
    InvalidChain(String),
    /// A node has both an outgoing edge and conditional edges; it must have exactly one.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),
    /// A value in a conditional path_map is not a valid node id or END.
    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),
}
