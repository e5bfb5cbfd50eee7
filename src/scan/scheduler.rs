// ABOUTME: The three cadenced poll loops: due-queue, backup-queue, and store scan
// ABOUTME: Discovery failures are logged and retried next cycle, never fatal

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::runner::{RetryRunner, RunnerContext, WorkerPool};

/// Cadences for the three discovery loops. The defaults mirror the
/// production profile: fast drains due retries, medium sweeps crashed
/// owners, slow is the safety net against queue loss.
#[derive(Debug, Clone)]
pub struct ScanIntervals {
    pub fast: Duration,
    pub medium: Duration,
    pub slow: Duration,
}

impl Default for ScanIntervals {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(1),
            medium: Duration::from_secs(5),
            slow: Duration::from_secs(30),
        }
    }
}

/// Owns the three scanner loops feeding the shared retry-runner pool.
///
/// The three paths may surface the same task; every drive locks under its
/// own lease identity, so a duplicate submission exits as a lock miss and
/// reconciliation stays best-effort: whichever fires first wins.
pub struct ScanScheduler {
    runner_ctx: RunnerContext,
    pool: Arc<WorkerPool>,
    intervals: ScanIntervals,
    cancel: CancellationToken,
}

impl ScanScheduler {
    pub fn new(runner_ctx: RunnerContext, pool: Arc<WorkerPool>) -> Self {
        Self {
            runner_ctx,
            pool,
            intervals: ScanIntervals::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_intervals(mut self, intervals: ScanIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Launch the three loops. They run until `shutdown` cancels them.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(
            fast = ?self.intervals.fast,
            medium = ?self.intervals.medium,
            slow = ?self.intervals.slow,
            "starting retry scanners"
        );

        vec![
            tokio::spawn(Self::fast_loop(
                self.runner_ctx.clone(),
                Arc::clone(&self.pool),
                self.intervals.fast,
                self.cancel.clone(),
            )),
            tokio::spawn(Self::medium_loop(
                self.runner_ctx.clone(),
                Arc::clone(&self.pool),
                self.intervals.medium,
                self.cancel.clone(),
            )),
            tokio::spawn(Self::slow_loop(
                self.runner_ctx.clone(),
                Arc::clone(&self.pool),
                self.intervals.slow,
                self.cancel.clone(),
            )),
        ]
    }

    pub fn shutdown(&self) {
        info!("stopping retry scanners");
        self.cancel.cancel();
    }

    /// Fast loop: drain the time-ordered retry queue for due items.
    async fn fast_loop(
        ctx: RunnerContext,
        pool: Arc<WorkerPool>,
        cadence: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match ctx.persister.due_tasks(Utc::now()).await {
                        Ok(task_ids) => submit_retries(&ctx, &pool, "fast", task_ids),
                        Err(error) => warn!(%error, "fast scan failed, retrying next cycle"),
                    }
                }
            }
        }
        debug!("fast scanner stopped");
    }

    /// Medium loop: drain the FIFO backup queue of tasks whose owner may
    /// have crashed while holding the lease.
    async fn medium_loop(
        ctx: RunnerContext,
        pool: Arc<WorkerPool>,
        cadence: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match ctx.persister.backup_tasks().await {
                        Ok(task_ids) => submit_retries(&ctx, &pool, "medium", task_ids),
                        Err(error) => warn!(%error, "medium scan failed, retrying next cycle"),
                    }
                }
            }
        }
        debug!("medium scanner stopped");
    }

    /// Slow loop (single shard): scan the durable store directly for tasks
    /// both queues lost.
    async fn slow_loop(
        ctx: RunnerContext,
        pool: Arc<WorkerPool>,
        cadence: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match ctx.persister.stuck_tasks(Utc::now()).await {
                        Ok(tasks) => {
                            let task_ids = tasks.into_iter().map(|t| t.task_id).collect();
                            submit_retries(&ctx, &pool, "slow", task_ids);
                        }
                        Err(error) => warn!(%error, "slow scan failed, retrying next cycle"),
                    }
                }
            }
        }
        debug!("slow scanner stopped");
    }
}

fn submit_retries(ctx: &RunnerContext, pool: &Arc<WorkerPool>, scanner: &'static str, task_ids: Vec<String>) {
    if task_ids.is_empty() {
        return;
    }
    debug!(scanner, count = task_ids.len(), "scanner discovered tasks");

    for task_id in task_ids {
        let runner = RetryRunner::new(ctx.clone());
        pool.submit(async move {
            if let Err(error) = runner.run(&task_id).await {
                warn!(task_id, %error, "retry runner failed");
            }
        });
    }
}
