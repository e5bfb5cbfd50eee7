// ABOUTME: Main library module for the switchyard workflow engine
// ABOUTME: Exports all core modules and provides the public API

pub mod config;
pub mod context;
pub mod engine;
pub mod graph;
pub mod persist;
pub mod retry;
pub mod runner;
pub mod scan;
pub mod task;

// Re-export commonly used types
pub use config::EngineConfig;
pub use context::{Resource, WorkFlow, WorkFlowStatus};
pub use engine::LocalEngine;
pub use graph::{Activity, ActivityResult, Graph, GraphLibrary, NextSteps, Node};
pub use persist::{DistributedLock, MemoryPersister, TaskPersister};
pub use retry::{ConstantPattern, RetryPattern, WideningPattern, MAX_RETRY_TIMES};
pub use runner::{DriveOutcome, ExecutionRunner, RetryRunner, RunnerContext, WorkerPool};
pub use scan::{ScanIntervals, ScanScheduler};
pub use task::{Task, TaskStatus, TaskStep};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
