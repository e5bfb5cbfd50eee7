// ABOUTME: Bounded, shared worker pool for runners, scanners, and async dependencies
// ABOUTME: Exhaustion queues work behind semaphore permits instead of rejecting it

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

/// Explicitly constructed, injected worker pool with a bounded size and
/// graceful-shutdown semantics. Submitted work waits for a permit rather
/// than being rejected, so pool exhaustion manifests as queuing delay.
pub struct WorkerPool {
    max_workers: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            semaphore: Arc::new(Semaphore::new(max_workers)),
        }
    }

    /// Submit a unit of work. The future starts once a permit is free and
    /// holds it for its whole run.
    pub fn submit<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("worker pool semaphore closed");
            future.await
        })
    }

    pub fn stats(&self) -> PoolStats {
        let available = self.semaphore.available_permits();
        PoolStats {
            max_workers: self.max_workers,
            available_permits: available,
            active_workers: self.max_workers - available,
        }
    }

    /// Wait until no submitted work is running.
    pub async fn wait_idle(&self) {
        let permits = self
            .semaphore
            .acquire_many(self.max_workers as u32)
            .await
            .expect("worker pool semaphore closed");
        drop(permits);
    }

    /// Graceful shutdown: wait up to `timeout_duration` for in-flight work
    /// to finish. Returns false when work was still running at the deadline.
    pub async fn shutdown(&self, timeout_duration: Duration) -> bool {
        info!(max_workers = self.max_workers, "shutting down worker pool");
        match timeout(timeout_duration, self.wait_idle()).await {
            Ok(()) => {
                info!("worker pool drained");
                true
            }
            Err(_) => {
                warn!(?timeout_duration, "worker pool shutdown timed out");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub max_workers: usize,
    pub available_permits: usize,
    pub active_workers: usize,
}
