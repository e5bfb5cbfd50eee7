// ABOUTME: Per-execution context shared by all nodes of one run
// ABOUTME: Holds the resource map, primary resource, audit log, and status

pub mod error;
pub mod registry;
pub mod resource;
pub mod workflow;

pub use error::{ContextError, Result};
pub use resource::{async_task_reference, Resource, PRIMARY_REFERENCE, TIME_OUT_REFERENCE};
pub use workflow::{AuditRecord, WorkFlow, WorkFlowStatus};
