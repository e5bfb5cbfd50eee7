// ABOUTME: Distributed execution and retry runners plus the shared worker pool
// ABOUTME: Runners replay a Task against the graph model under a persister lease

pub mod error;
pub mod execution;
pub mod pool;
pub mod retry;

mod drive;

pub use drive::{DriveOutcome, RunnerContext};
pub use error::{Result, RunnerError};
pub use execution::ExecutionRunner;
pub use pool::{PoolStats, WorkerPool};
pub use retry::RetryRunner;
