// ABOUTME: Graph, Node, and NextSteps routing structures
// ABOUTME: A graph is built once at load time and is read-only afterwards

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::activity::{Activity, ActivityResult};
use super::error::{GraphError, Result};

/// Routing table from activity outcome to successor node name.
///
/// Routing is total: a reached outcome with no mapped successor ends the
/// traversal, it is never an error.
#[derive(Debug, Clone, Default)]
pub struct NextSteps {
    steps: HashMap<ActivityResult, String>,
}

impl NextSteps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, outcome: ActivityResult, node_name: impl Into<String>) -> Self {
        self.steps.insert(outcome, node_name.into());
        self
    }

    pub fn route(&self, outcome: ActivityResult) -> Option<&str> {
        self.steps.get(&outcome).map(|s| s.as_str())
    }

    pub fn successors(&self) -> impl Iterator<Item = &str> {
        self.steps.values().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// One step in a graph: a named activity plus its outcome routing, optional
/// async-dependency and daemon launches, and an optional per-node retry
/// interval table that overrides the global retry pattern.
#[derive(Clone)]
pub struct Node {
    name: String,
    activity: Arc<dyn Activity>,
    next_steps: NextSteps,
    async_dependencies: Vec<String>,
    daemon_nodes: Vec<String>,
    retry_intervals: Vec<u64>,
}

impl Node {
    pub fn new(name: impl Into<String>, activity: Arc<dyn Activity>) -> Self {
        Self {
            name: name.into(),
            activity,
            next_steps: NextSteps::new(),
            async_dependencies: Vec::new(),
            daemon_nodes: Vec::new(),
            retry_intervals: Vec::new(),
        }
    }

    pub fn with_next_steps(mut self, next_steps: NextSteps) -> Self {
        self.next_steps = next_steps;
        self
    }

    pub fn with_async_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.async_dependencies = dependencies;
        self
    }

    pub fn with_daemon_nodes(mut self, daemons: Vec<String>) -> Self {
        self.daemon_nodes = daemons;
        self
    }

    /// Per-node retry intervals in milliseconds, indexed by retry count.
    /// When present these take precedence over the global retry pattern.
    pub fn with_retry_intervals(mut self, intervals: Vec<u64>) -> Self {
        self.retry_intervals = intervals;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activity(&self) -> &Arc<dyn Activity> {
        &self.activity
    }

    pub fn next_steps(&self) -> &NextSteps {
        &self.next_steps
    }

    pub fn async_dependencies(&self) -> &[String] {
        &self.async_dependencies
    }

    pub fn daemon_nodes(&self) -> &[String] {
        &self.daemon_nodes
    }

    /// Retry interval override for the given retry count, capped at the
    /// table's final entry. `None` when the node carries no override table.
    pub fn retry_interval(&self, retry_count: u32) -> Option<u64> {
        if self.retry_intervals.is_empty() {
            return None;
        }
        let index = (retry_count as usize).min(self.retry_intervals.len() - 1);
        Some(self.retry_intervals[index])
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("next_steps", &self.next_steps)
            .field("async_dependencies", &self.async_dependencies)
            .field("daemon_nodes", &self.daemon_nodes)
            .finish()
    }
}

/// A named, directed, statically-loaded workflow definition.
///
/// Node insertion order is preserved so that diagnostics and audit output
/// are stable across runs.
#[derive(Clone)]
pub struct Graph {
    name: String,
    resource_type: String,
    nodes: IndexMap<String, Arc<Node>>,
    start_node: String,
    default_error_node: Option<String>,
}

impl Graph {
    pub fn new(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        start_node: impl Into<String>,
        nodes: Vec<Node>,
    ) -> Self {
        let mut node_map = IndexMap::with_capacity(nodes.len());
        for node in nodes {
            node_map.insert(node.name().to_string(), Arc::new(node));
        }

        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            nodes: node_map,
            start_node: start_node.into(),
            default_error_node: None,
        }
    }

    pub fn with_default_error_node(mut self, node_name: impl Into<String>) -> Self {
        self.default_error_node = Some(node_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn start_node_name(&self) -> &str {
        &self.start_node
    }

    pub fn default_error_node(&self) -> Option<&str> {
        self.default_error_node.as_deref()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    pub fn node(&self, name: &str) -> Result<Arc<Node>> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNode {
                graph: self.name.clone(),
                node: name.to_string(),
            })
    }

    pub fn start_node(&self) -> Result<Arc<Node>> {
        self.node(&self.start_node)
    }

    /// Resolve the successor for an outcome at a node.
    ///
    /// A missing edge returns `Ok(None)` and ends traversal. A mapped edge
    /// pointing at an undefined node is an invariant violation that
    /// `validate` rejects at load time.
    pub fn route(&self, node: &Node, outcome: ActivityResult) -> Result<Option<Arc<Node>>> {
        match node.next_steps().route(outcome) {
            Some(next_name) => {
                let next =
                    self.nodes
                        .get(next_name)
                        .cloned()
                        .ok_or_else(|| GraphError::DanglingReference {
                            graph: self.name.clone(),
                            from: node.name().to_string(),
                            to: next_name.to_string(),
                        })?;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    /// Check referential integrity: the start node, the default-error node,
    /// every routed successor, and every async-dependency/daemon node must
    /// be defined in this graph.
    pub fn validate(&self) -> Result<()> {
        if !self.nodes.contains_key(&self.start_node) {
            return Err(GraphError::MissingStartNode {
                graph: self.name.clone(),
                start: self.start_node.clone(),
            });
        }

        if let Some(error_node) = &self.default_error_node {
            if !self.nodes.contains_key(error_node) {
                return Err(GraphError::UnknownNode {
                    graph: self.name.clone(),
                    node: error_node.clone(),
                });
            }
        }

        for node in self.nodes.values() {
            let referenced = node
                .next_steps()
                .successors()
                .chain(node.async_dependencies().iter().map(|s| s.as_str()))
                .chain(node.daemon_nodes().iter().map(|s| s.as_str()));

            for target in referenced {
                if !self.nodes.contains_key(target) {
                    return Err(GraphError::DanglingReference {
                        graph: self.name.clone(),
                        from: node.name().to_string(),
                        to: target.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("resource_type", &self.resource_type)
            .field("start_node", &self.start_node)
            .field("default_error_node", &self.default_error_node)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}
