// ABOUTME: Error types for distributed runners
// ABOUTME: Wraps graph, context, and persistence failures surfaced while driving a task

use thiserror::Error;

use crate::context::ContextError;
use crate::graph::GraphError;
use crate::persist::PersistError;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("task payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
