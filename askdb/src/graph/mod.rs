//! Minimal state graph runtime: nodes, fixed edges, conditional edges and
//! node middleware. The dialogue orchestrator is one compiled graph over
//! [`crate::state::TurnState`].

mod compile_error;
mod compiled;
mod conditional;
mod logging_middleware;
mod next;
mod node;
mod node_middleware;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn};
pub use logging_middleware::LoggingNodeMiddleware;
pub use next::Next;
pub use node::Node;
pub use node_middleware::{NodeMiddleware, NodeRunFn};
pub use state_graph::{StateGraph, END, START};
