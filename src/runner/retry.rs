// ABOUTME: Retry runner: resumes a persisted task from its last recorded node
// ABOUTME: Enforces the global retry ceiling and the per-node interval overrides

use tracing::{debug, info, instrument, warn};

use super::drive::{drive_task, DriveOutcome, RunnerContext};
use super::error::Result;
use crate::context::{Resource, WorkFlow};
use crate::task::Task;

/// A unit of work submitted to the shared pool to resume one suspended
/// task. Scanners hand every discovered task id to one of these.
pub struct RetryRunner {
    ctx: RunnerContext,
}

impl RetryRunner {
    pub fn new(ctx: RunnerContext) -> Self {
        Self { ctx }
    }

    /// Rebuild the execution context from the persisted snapshot and drive
    /// the task onward. Returns `None` when there is nothing to do: the
    /// task is unknown (queue entry outlived the store row) or already
    /// terminal.
    #[instrument(skip(self), fields(task_id))]
    pub async fn run(&self, task_id: &str) -> Result<Option<(Task, DriveOutcome)>> {
        let Some(mut task) = self.ctx.persister.load_task(task_id).await? else {
            warn!("task not found in store, dropping retry");
            return Ok(None);
        };

        if task.is_terminal() {
            debug!(status = %task.status, "task already terminal, nothing to resume");
            return Ok(None);
        }

        let workflow = WorkFlow::new(task.application.clone());
        if let Some(primary_json) = &task.primary_resource {
            let primary: Resource = serde_json::from_str(primary_json)?;
            workflow.attach_primary(primary).await?;
        }
        if let Some(transfer_data) = self.ctx.persister.retrieve_data(task_id).await? {
            workflow.import_resources(&transfer_data).await?;
        }
        workflow.mark_working().await?;

        task.mark_processing();
        info!(
            task_id = %task.task_id,
            node = %task.node_name,
            retry_times = task.retry_times,
            "resuming suspended task"
        );
        let driven = drive_task(&self.ctx, task, &workflow, true, false).await?;
        Ok(Some(driven))
    }
}
