// ABOUTME: Execution runner: drives a brand-new task from its graph's start node
// ABOUTME: On suspend it persists and exits; a scanner resumes the task later

use tracing::{info, instrument};

use super::drive::{drive_task, DriveOutcome, RunnerContext};
use super::error::Result;
use crate::context::{Resource, WorkFlow};
use crate::task::Task;

/// A unit of work submitted to the shared pool to start one distributed
/// execution.
pub struct ExecutionRunner {
    ctx: RunnerContext,
}

impl ExecutionRunner {
    pub fn new(ctx: RunnerContext) -> Self {
        Self { ctx }
    }

    /// Create a fresh task for the named graph and drive it until it
    /// suspends or terminates. Returns the final snapshot together with how
    /// the drive ended.
    #[instrument(skip(self, primary), fields(application, graph = graph_name))]
    pub async fn run(
        &self,
        application: &str,
        graph_name: &str,
        primary: Resource,
    ) -> Result<(Task, DriveOutcome)> {
        let graph = self.ctx.graphs.get(graph_name)?;

        let mut task = Task::new(application, graph_name, graph.start_node_name());
        task.primary_resource = Some(serde_json::to_string(&primary)?);
        task.mark_processing();

        let workflow = WorkFlow::new(application);
        workflow.attach_primary(primary).await?;
        workflow.mark_working().await?;

        info!(task_id = %task.task_id, "starting new distributed task");
        drive_task(&self.ctx, task, &workflow, false, true).await
    }
}
