// ABOUTME: The shared lease-guarded step loop both runner flavors drive a task with
// ABOUTME: Persists the snapshot after every hop so any worker can resume it

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::Result;
use crate::context::WorkFlow;
use crate::graph::{ActivityResult, GraphLibrary};
use crate::persist::TaskPersister;
use crate::retry::{RetryPattern, MAX_RETRY_TIMES};
use crate::task::{Task, TaskStep};

/// Shared dependencies every runner needs: the graph library, the persister
/// (carrying this worker's identity), and the global retry pattern.
#[derive(Clone)]
pub struct RunnerContext {
    pub graphs: Arc<GraphLibrary>,
    pub persister: Arc<dyn TaskPersister>,
    pub pattern: Arc<dyn RetryPattern>,
}

impl RunnerContext {
    pub fn new(
        graphs: Arc<GraphLibrary>,
        persister: Arc<dyn TaskPersister>,
        pattern: Arc<dyn RetryPattern>,
    ) -> Self {
        Self {
            graphs,
            persister,
            pattern,
        }
    }
}

/// How one drive of a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// Traversal reached a terminal node; the task is COMPLETED.
    Completed,
    /// The final outcome was FAIL or the retry ceiling converted it; the
    /// task is FAILED with its step history retained.
    Failed,
    /// The task is parked PENDING; a scanner will resume it later.
    Suspended,
    /// Another runner owns the lease. Not an error: this runner exits with
    /// no side effects.
    LockMissed,
}

/// Advance a task hop by hop until it suspends, terminates, or loses the
/// lease race.
///
/// Every hop: acquire/refresh the lease, execute the node's activity, then
/// persist the updated snapshot plus an audit step. Activity failures are
/// treated as SUSPEND — recoverability is the default assumption for
/// distributed steps. With `enforce_ceiling` the per-node retry counter is
/// bounded by `MAX_RETRY_TIMES`, converting the outcome to FAIL at the
/// ceiling.
pub(crate) async fn drive_task(
    ctx: &RunnerContext,
    mut task: Task,
    workflow: &WorkFlow,
    enforce_ceiling: bool,
    mut is_new: bool,
) -> Result<(Task, DriveOutcome)> {
    let graph = ctx.graphs.get(&task.graph_name)?;
    let mut current = graph.node(&task.node_name)?;

    // This drive locks under its own owner identity: a duplicate submission
    // of the same task on this worker misses the lock instead of riding the
    // worker-wide lease.
    let persister = ctx.persister.drive_handle();

    loop {
        if !persister.try_lock(&task.task_id).await? {
            debug!(task_id = %task.task_id, "lease held by another runner, exiting");
            return Ok((task, DriveOutcome::LockMissed));
        }

        let outcome = match current.activity().execute(workflow).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    task_id = %task.task_id,
                    node = current.name(),
                    %error,
                    "activity failed, treating as suspend"
                );
                ActivityResult::Suspend
            }
        };

        workflow
            .audit(format!(
                "task '{}' node '{}' -> {}",
                task.task_id,
                current.name(),
                outcome
            ))
            .await;
        task.transfer_data = Some(workflow.export_resources().await?);
        task.last_execution_time = Some(Utc::now());

        if outcome == ActivityResult::Suspend {
            task.retry_times += 1;

            if enforce_ceiling && task.retry_times >= MAX_RETRY_TIMES {
                return fail_at_ceiling(&persister, task, workflow, &graph, is_new).await;
            }

            // A retry has not happened yet, so the interval for the wait
            // ahead is indexed by the count before this suspend.
            let count = task.retry_times - 1;
            let interval = current
                .retry_interval(count)
                .unwrap_or_else(|| ctx.pattern.interval(count));

            task.mark_pending(interval);
            let step = TaskStep::record(&task, ActivityResult::Suspend, task.transfer_data.clone());
            persister.suspend(&task, interval, &step).await?;

            info!(
                task_id = %task.task_id,
                node = %task.node_name,
                retry_times = task.retry_times,
                interval,
                "task suspended for retry"
            );
            return Ok((task, DriveOutcome::Suspended));
        }

        let step = TaskStep::record(&task, outcome, task.transfer_data.clone());

        match graph.route(&current, outcome)? {
            Some(next) => {
                // Advancing past the node resets its retry counter.
                task.advance_to(next.name());
                persister.set_hub(&task, is_new, &step).await?;
                is_new = false;
                debug!(task_id = %task.task_id, node = next.name(), "task advanced");
                current = next;
            }
            None => {
                let drive_outcome = if outcome == ActivityResult::Fail {
                    task.mark_failed();
                    DriveOutcome::Failed
                } else {
                    task.mark_completed();
                    DriveOutcome::Completed
                };

                persister.set_hub(&task, is_new, &step).await?;
                persister.complete(&task).await?;
                info!(task_id = %task.task_id, status = %task.status, "task reached terminal state");
                return Ok((task, drive_outcome));
            }
        }
    }
}

/// Retry ceiling reached: convert to FAIL, give the default-error node one
/// best-effort execution, and mark the task FAILED.
async fn fail_at_ceiling(
    persister: &Arc<dyn TaskPersister>,
    mut task: Task,
    workflow: &WorkFlow,
    graph: &crate::graph::Graph,
    is_new: bool,
) -> Result<(Task, DriveOutcome)> {
    warn!(
        task_id = %task.task_id,
        node = %task.node_name,
        retry_times = task.retry_times,
        "retry ceiling reached, converting to FAIL"
    );

    let step = TaskStep::record(&task, ActivityResult::Fail, task.transfer_data.clone());
    task.mark_failed();
    persister.set_hub(&task, is_new, &step).await?;

    if let Some(error_node_name) = graph.default_error_node() {
        let error_node = graph.node(error_node_name)?;
        if let Err(error) = error_node.activity().execute(workflow).await {
            warn!(node = error_node_name, %error, "default error node failed");
        }
        workflow
            .audit(format!(
                "task '{}' routed to default error node '{}'",
                task.task_id, error_node_name
            ))
            .await;
    }

    persister.complete(&task).await?;
    Ok((task, DriveOutcome::Failed))
}
