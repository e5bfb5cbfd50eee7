// ABOUTME: Process-level registry of named, validated graphs
// ABOUTME: Graphs are registered once at load time and shared read-only across executions

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use super::error::{GraphError, Result};
use super::model::Graph;

/// Named graph store shared by the local engine and every distributed runner.
///
/// Registration validates the graph and rejects duplicate names; lookups of
/// unknown graphs fail with an explicit invariant error and create no
/// partial state.
#[derive(Default)]
pub struct GraphLibrary {
    graphs: RwLock<HashMap<String, Arc<Graph>>>,
}

impl GraphLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, graph: Graph) -> Result<()> {
        graph.validate()?;

        let mut graphs = self.graphs.write().expect("graph library lock poisoned");
        if graphs.contains_key(graph.name()) {
            return Err(GraphError::DuplicateGraph {
                name: graph.name().to_string(),
            });
        }

        info!(graph = graph.name(), nodes = graph.node_names().count(), "registered graph");
        graphs.insert(graph.name().to_string(), Arc::new(graph));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Graph>> {
        let graphs = self.graphs.read().expect("graph library lock poisoned");
        graphs
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownGraph {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        let graphs = self.graphs.read().expect("graph library lock poisoned");
        graphs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.graphs.read().expect("graph library lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
