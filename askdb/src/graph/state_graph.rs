//! State graph: nodes + explicit edges (from → to) and conditional edges.
//!
//! Add nodes with `add_node`, wire them with `add_edge(from, to)` using `START`
//! and `END` for entry and exit, and route on state with
//! `add_conditional_edges`. A node has either one outgoing edge or conditional
//! edges, not both. `compile` validates the wiring.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
use crate::graph::node::Node;
use crate::graph::node_middleware::NodeMiddleware;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";
/// Sentinel for graph exit.
pub const END: &str = "__end__";

const DEFAULT_STEP_LIMIT: usize = 64;

/// State graph generic over state type `S`.
///
/// **Interaction**: Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    step_limit: usize,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            middleware: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Attaches node middleware; `compile()` wraps every node.run with it.
    pub fn with_middleware(self, middleware: Arc<dyn NodeMiddleware<S>>) -> Self {
        Self {
            middleware: Some(middleware),
            ..self
        }
    }

    /// Maximum node executions per invoke; exceeding it fails the run.
    pub fn with_step_limit(self, step_limit: usize) -> Self {
        Self { step_limit, ..self }
    }

    /// Adds a node; replaces any node with the same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// After `source` runs, `path(state)` picks the next node, through `path_map`
    /// when provided. Every mapped target must be a node id or `END`.
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Validates the wiring and builds the executable graph.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(path_map) = &router.path_map {
                for target in path_map.values() {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                    }
                }
            }
        }

        let mut start_edges = self.edges.iter().filter(|(f, _)| f == START);
        let first = match (start_edges.next(), start_edges.next()) {
            (None, _) => return Err(CompilationError::MissingStart),
            (Some((_, to)), None) => to.clone(),
            (Some(_), Some(_)) => {
                return Err(CompilationError::InvalidChain(
                    "multiple edges from START".into(),
                ))
            }
        };

        let has_end = self.edges.iter().any(|(_, t)| t == END)
            || self.conditional_edges.values().any(|r| {
                r.path_map
                    .as_ref()
                    .map_or(true, |m| m.values().any(|v| v == END))
            });
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }

        let mut edge_froms = HashSet::new();
        for (from, _) in self.edges.iter().filter(|(f, _)| f != START) {
            if !edge_froms.insert(from.clone()) {
                return Err(CompilationError::InvalidChain(format!(
                    "node {} has more than one outgoing edge",
                    from
                )));
            }
        }
        for source in self.conditional_edges.keys() {
            if edge_froms.contains(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }

        let mut next_map: HashMap<String, NextEntry<S>> = self
            .edges
            .iter()
            .filter(|(f, _)| f != START)
            .map(|(f, t)| (f.clone(), NextEntry::Unconditional(t.clone())))
            .collect();
        for (source, router) in self.conditional_edges {
            next_map.insert(source, NextEntry::Conditional(router));
        }

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            next_map,
            middleware: self.middleware,
            step_limit: self.step_limit,
        })
    }
}
