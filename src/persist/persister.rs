// ABOUTME: The Task Persister contract: distributed lock + durable storage + transient queues
// ABOUTME: The single synchronization point for distributed execution

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::error::Result;
use crate::task::{Task, TaskStep};

/// Contract every persistence backend must satisfy. Any combination of
/// key-value store, relational/document store, and message queue works as
/// long as these semantics hold.
///
/// Ordering guarantee: for a given task id, at most one holder may
/// successfully call `set_hub`/`suspend`/`complete` at a time; conflicting
/// writers are rejected with `LeaseLost`. No global transaction spans the
/// lock, the store write, and the queue write — steps are at-least-once
/// under crash-at-the-wrong-moment scenarios.
#[async_trait]
pub trait TaskPersister: Send + Sync {
    /// A handle over the same backend whose lease operations use a fresh
    /// owner identity. Every drive of a task locks under its own identity,
    /// so lease reentrancy spans the hops of one drive and two runners on
    /// the same worker contend like runners on different workers.
    fn drive_handle(&self) -> Arc<dyn TaskPersister>;

    /// Acquire the time-bounded lease on a task. Reentrant for the current
    /// holder, stealable from a holder whose lease has expired. `false`
    /// means another runner owns the task; that is not an error.
    async fn try_lock(&self, task_id: &str) -> Result<bool>;

    async fn release_lock(&self, task_id: &str) -> Result<()>;

    /// Atomically insert or update the task row and append a step.
    ///
    /// Only permitted while holding the lease; fails with `LeaseLost` when
    /// ownership has been lost mid-operation.
    async fn set_hub(&self, task: &Task, is_new: bool, step: &TaskStep) -> Result<bool>;

    /// Persist the task as PENDING, enqueue it into the time-ordered retry
    /// queue at `now + interval`, append the step, and release the lease.
    async fn suspend(&self, task: &Task, interval_millis: u64, step: &TaskStep) -> Result<()>;

    /// Mark the task terminal, remove it from all pending queues, and
    /// release any residual lease.
    async fn complete(&self, task: &Task) -> Result<()>;

    /// Most recent transfer payload for resumption.
    async fn retrieve_data(&self, task_id: &str) -> Result<Option<String>>;

    async fn load_task(&self, task_id: &str) -> Result<Option<Task>>;

    /// Step history of a task, oldest first. Retained after terminal states
    /// for inspection and manual re-run.
    async fn steps(&self, task_id: &str) -> Result<Vec<TaskStep>>;

    /// Drain task ids from the time-ordered retry queue whose due time has
    /// elapsed.
    async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<String>>;

    /// Drain the FIFO backup queue: tasks that were locked but whose owner
    /// may have crashed before persisting a suspend.
    async fn backup_tasks(&self) -> Result<Vec<String>>;

    /// Scan the durable store for tasks whose next execution time has
    /// passed but that sit in neither transient queue — the safety net
    /// against queue loss.
    async fn stuck_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;
}
