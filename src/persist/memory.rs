// ABOUTME: In-memory reference implementation of the Task Persister contract
// ABOUTME: Backs tests and single-process deployments; every mutation is lease-checked

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{PersistError, Result};
use super::lock::{DistributedLock, LeaseTable};
use super::persister::TaskPersister;
use crate::task::{Task, TaskStatus, TaskStep};

#[derive(Debug, Default)]
struct MemoryState {
    tasks: HashMap<String, Task>,
    steps: Vec<TaskStep>,
    // Ordered by due time; ties broken by task id.
    retry_queue: BTreeSet<(DateTime<Utc>, String)>,
    backup_queue: VecDeque<String>,
}

/// Reference backend: task store, step log, time-ordered retry queue, FIFO
/// backup queue, and a lease table, all in process memory.
///
/// Each instance carries one owner identity, so a fleet of simulated
/// workers is a set of `MemoryPersister` handles sharing the same state —
/// tests construct that via `share_with`.
pub struct MemoryPersister {
    owner: String,
    lease_ttl_millis: u64,
    lock: std::sync::Arc<LeaseTable>,
    state: std::sync::Arc<RwLock<MemoryState>>,
}

impl MemoryPersister {
    pub fn new(owner: impl Into<String>, lease_ttl_millis: u64) -> Self {
        Self {
            owner: owner.into(),
            lease_ttl_millis,
            lock: std::sync::Arc::new(LeaseTable::new()),
            state: std::sync::Arc::new(RwLock::new(MemoryState::default())),
        }
    }

    /// Another worker's view onto the same store and lease table.
    pub fn share_with(&self, owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            lease_ttl_millis: self.lease_ttl_millis,
            lock: std::sync::Arc::clone(&self.lock),
            state: std::sync::Arc::clone(&self.state),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    async fn ensure_lease(&self, task_id: &str) -> Result<()> {
        if self.lock.is_owned_by(task_id, &self.owner).await? {
            Ok(())
        } else {
            Err(PersistError::LeaseLost {
                task_id: task_id.to_string(),
            })
        }
    }
}

#[async_trait]
impl TaskPersister for MemoryPersister {
    fn drive_handle(&self) -> std::sync::Arc<dyn TaskPersister> {
        std::sync::Arc::new(
            self.share_with(format!("{}/{}", self.owner, uuid::Uuid::new_v4())),
        )
    }

    async fn try_lock(&self, task_id: &str) -> Result<bool> {
        let acquired = self
            .lock
            .try_acquire(task_id, &self.owner, self.lease_ttl_millis)
            .await?;

        if acquired {
            // Track the lock in the backup queue so a crashed owner's task
            // is rediscovered by the medium scanner.
            let mut state = self.state.write().await;
            if !state.backup_queue.iter().any(|id| id == task_id) {
                state.backup_queue.push_back(task_id.to_string());
            }
        }
        Ok(acquired)
    }

    async fn release_lock(&self, task_id: &str) -> Result<()> {
        self.lock.release(task_id, &self.owner).await
    }

    async fn set_hub(&self, task: &Task, is_new: bool, step: &TaskStep) -> Result<bool> {
        self.ensure_lease(&task.task_id).await?;

        let mut state = self.state.write().await;
        if is_new && state.tasks.contains_key(&task.task_id) {
            return Ok(false);
        }

        state.tasks.insert(task.task_id.clone(), task.clone());
        state.steps.push(step.clone());
        debug!(task_id = %task.task_id, node = %task.node_name, status = %task.status, "persisted task hub");
        Ok(true)
    }

    async fn suspend(&self, task: &Task, interval_millis: u64, step: &TaskStep) -> Result<()> {
        self.ensure_lease(&task.task_id).await?;

        let due = Utc::now() + Duration::milliseconds(interval_millis as i64);
        {
            let mut state = self.state.write().await;

            let mut snapshot = task.clone();
            snapshot.status = TaskStatus::Pending;
            snapshot.next_execution_time = Some(due);
            state.tasks.insert(task.task_id.clone(), snapshot);
            state.steps.push(step.clone());
            state.retry_queue.insert((due, task.task_id.clone()));
            state.backup_queue.retain(|id| id != &task.task_id);
        }

        debug!(task_id = %task.task_id, interval_millis, "suspended task");
        self.lock.release(&task.task_id, &self.owner).await
    }

    async fn complete(&self, task: &Task) -> Result<()> {
        self.ensure_lease(&task.task_id).await?;

        {
            let mut state = self.state.write().await;
            state.tasks.insert(task.task_id.clone(), task.clone());
            state.retry_queue.retain(|(_, id)| id != &task.task_id);
            state.backup_queue.retain(|id| id != &task.task_id);
        }

        debug!(task_id = %task.task_id, status = %task.status, "completed task");
        self.lock.release(&task.task_id, &self.owner).await
    }

    async fn retrieve_data(&self, task_id: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .get(task_id)
            .and_then(|task| task.transfer_data.clone()))
    }

    async fn load_task(&self, task_id: &str) -> Result<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.get(task_id).cloned())
    }

    async fn steps(&self, task_id: &str) -> Result<Vec<TaskStep>> {
        let state = self.state.read().await;
        Ok(state
            .steps
            .iter()
            .filter(|step| step.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut state = self.state.write().await;

        let due: Vec<(DateTime<Utc>, String)> = state
            .retry_queue
            .iter()
            .take_while(|(at, _)| *at <= now)
            .cloned()
            .collect();

        for entry in &due {
            state.retry_queue.remove(entry);
        }
        Ok(due.into_iter().map(|(_, id)| id).collect())
    }

    async fn backup_tasks(&self) -> Result<Vec<String>> {
        let mut state = self.state.write().await;
        Ok(state.backup_queue.drain(..).collect())
    }

    async fn stuck_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| {
                !task.is_terminal()
                    && task
                        .next_execution_time
                        .map(|due| due <= now)
                        .unwrap_or(false)
                    && !state.retry_queue.iter().any(|(_, id)| id == &task.task_id)
                    && !state.backup_queue.iter().any(|id| id == &task.task_id)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ActivityResult;

    fn task() -> Task {
        Task::new("billing", "order_flow", "n1")
    }

    #[tokio::test]
    async fn test_set_hub_requires_lease() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let task = task();
        let step = TaskStep::record(&task, ActivityResult::Success, None);

        let err = persister.set_hub(&task, true, &step).await.unwrap_err();
        assert!(matches!(err, PersistError::LeaseLost { .. }));

        assert!(persister.try_lock(&task.task_id).await.unwrap());
        assert!(persister.set_hub(&task, true, &step).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_hub_rejects_foreign_writer() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let rival = persister.share_with("worker-b");
        let task = task();
        let step = TaskStep::record(&task, ActivityResult::Success, None);

        assert!(persister.try_lock(&task.task_id).await.unwrap());

        // The rival does not hold the lease; its write must fail loudly.
        let err = rival.set_hub(&task, true, &step).await.unwrap_err();
        assert!(matches!(err, PersistError::LeaseLost { .. }));
    }

    #[tokio::test]
    async fn test_suspend_enqueues_and_releases() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let mut task = task();
        persister.try_lock(&task.task_id).await.unwrap();

        task.mark_pending(0);
        let step = TaskStep::record(&task, ActivityResult::Suspend, None);
        persister.suspend(&task, 0, &step).await.unwrap();

        // Lease released: a rival can pick the task up.
        let rival = persister.share_with("worker-b");
        assert!(rival.try_lock(&task.task_id).await.unwrap());

        // Entry is due immediately.
        let due = rival.due_tasks(Utc::now()).await.unwrap();
        assert_eq!(due, vec![task.task_id.clone()]);

        // Drained entries do not reappear.
        assert!(rival.due_tasks(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_due_tasks_respects_order_and_time() {
        let persister = MemoryPersister::new("worker-a", 60_000);

        let mut near = task();
        let mut far = task();
        persister.try_lock(&near.task_id).await.unwrap();
        near.mark_pending(0);
        let step = TaskStep::record(&near, ActivityResult::Suspend, None);
        persister.suspend(&near, 0, &step).await.unwrap();

        persister.try_lock(&far.task_id).await.unwrap();
        far.mark_pending(60_000);
        let step = TaskStep::record(&far, ActivityResult::Suspend, None);
        persister.suspend(&far, 60_000, &step).await.unwrap();

        let due = persister.due_tasks(Utc::now()).await.unwrap();
        assert_eq!(due, vec![near.task_id.clone()]);

        let later = Utc::now() + Duration::milliseconds(120_000);
        let due = persister.due_tasks(later).await.unwrap();
        assert_eq!(due, vec![far.task_id.clone()]);
    }

    #[tokio::test]
    async fn test_backup_queue_tracks_held_locks() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let task = task();

        persister.try_lock(&task.task_id).await.unwrap();
        let backup = persister.backup_tasks().await.unwrap();
        assert_eq!(backup, vec![task.task_id.clone()]);

        // Drained: a healthy owner that suspends or completes never
        // reappears here.
        assert!(persister.backup_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_clears_queues() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let mut task = task();

        persister.try_lock(&task.task_id).await.unwrap();
        task.mark_completed();
        persister.complete(&task).await.unwrap();

        assert!(persister.due_tasks(Utc::now()).await.unwrap().is_empty());
        assert!(persister.backup_tasks().await.unwrap().is_empty());
        assert!(persister
            .load_task(&task.task_id)
            .await
            .unwrap()
            .unwrap()
            .is_terminal());
    }

    #[tokio::test]
    async fn test_drive_handles_contend_like_separate_workers() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let first = persister.drive_handle();
        let second = persister.drive_handle();

        assert!(first.try_lock("t1").await.unwrap());
        // A sibling drive on the same worker does not inherit the lease.
        assert!(!second.try_lock("t1").await.unwrap());
        // Still reentrant within one drive.
        assert!(first.try_lock("t1").await.unwrap());

        first.release_lock("t1").await.unwrap();
        assert!(second.try_lock("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_stuck_tasks_safety_net() {
        let persister = MemoryPersister::new("worker-a", 60_000);
        let mut task = task();

        persister.try_lock(&task.task_id).await.unwrap();
        task.mark_pending(0);
        let step = TaskStep::record(&task, ActivityResult::Suspend, None);
        persister.suspend(&task, 0, &step).await.unwrap();

        // Simulate queue loss: drain both queues without running the task.
        persister.due_tasks(Utc::now()).await.unwrap();
        persister.backup_tasks().await.unwrap();

        let stuck = persister.stuck_tasks(Utc::now()).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].task_id, task.task_id);
    }
}
