// ABOUTME: Error types for the graph model
// ABOUTME: Covers unknown graphs/nodes and load-time reference validation failures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("unknown graph: {name}")]
    UnknownGraph { name: String },

    #[error("unknown node '{node}' in graph '{graph}'")]
    UnknownNode { graph: String, node: String },

    #[error("duplicate graph name: {name}")]
    DuplicateGraph { name: String },

    #[error("graph '{graph}' start node '{start}' is not defined")]
    MissingStartNode { graph: String, start: String },

    #[error("graph '{graph}' node '{from}' references undefined node '{to}'")]
    DanglingReference {
        graph: String,
        from: String,
        to: String,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;
