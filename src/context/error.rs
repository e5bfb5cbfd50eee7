// ABOUTME: Error types for execution context operations
// ABOUTME: Invariant violations around the primary resource and status transitions

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("primary resource already attached as '{existing}'")]
    PrimaryAlreadyAttached { existing: String },

    #[error("execution context is closed")]
    ContextClosed,

    #[error("resource payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ContextError>;
