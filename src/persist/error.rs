// ABOUTME: Error types for persistence and distributed locking
// ABOUTME: LeaseLost is the loud failure guarding against split-brain task mutation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    /// Lease ownership was lost mid-operation. Writes must fail loudly here:
    /// another owner must never be silently overwritten.
    #[error("lease on task '{task_id}' lost or held by another owner")]
    LeaseLost { task_id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
