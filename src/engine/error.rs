// ABOUTME: Error types for local engine traversal
// ABOUTME: Graph and context invariant violations plus propagated activity failures

use thiserror::Error;

use crate::context::ContextError;
use crate::graph::GraphError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// A node's activity failed. The local engine propagates this to the
    /// caller; distributed runners never see it (they treat activity
    /// failures as a recoverable suspend).
    #[error("activity failed at node '{node}' in graph '{graph}': {source}")]
    Activity {
        graph: String,
        node: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
