// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides scripted activities and context builders for graph executions

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use switchyard::context::WorkFlow;
use switchyard::graph::{Activity, ActivityResult, GraphLibrary};
use switchyard::persist::MemoryPersister;
use switchyard::retry::ConstantPattern;
use switchyard::runner::RunnerContext;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Always reports the same outcome and counts its visits.
pub struct Scripted {
    outcome: ActivityResult,
    visits: Arc<AtomicU32>,
}

impl Scripted {
    pub fn new(outcome: ActivityResult) -> (Arc<dyn Activity>, Arc<AtomicU32>) {
        let visits = Arc::new(AtomicU32::new(0));
        (
            Arc::new(Self {
                outcome,
                visits: Arc::clone(&visits),
            }),
            visits,
        )
    }
}

#[async_trait]
impl Activity for Scripted {
    async fn execute(&self, _context: &WorkFlow) -> anyhow::Result<ActivityResult> {
        self.visits.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome)
    }
}

/// Plays a fixed script of outcomes; once exhausted it repeats the last
/// entry. The cursor is shared across resumptions of the same graph.
pub struct Sequenced {
    outcomes: Vec<ActivityResult>,
    cursor: AtomicUsize,
}

impl Sequenced {
    pub fn new(outcomes: Vec<ActivityResult>) -> Arc<dyn Activity> {
        Arc::new(Self {
            outcomes,
            cursor: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Activity for Sequenced {
    async fn execute(&self, _context: &WorkFlow) -> anyhow::Result<ActivityResult> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcomes[index.min(self.outcomes.len() - 1)])
    }
}

/// Always returns an error from `execute`.
pub struct Erroring;

impl Erroring {
    pub fn new() -> Arc<dyn Activity> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Activity for Erroring {
    async fn execute(&self, _context: &WorkFlow) -> anyhow::Result<ActivityResult> {
        anyhow::bail!("downstream unavailable")
    }
}

/// Runner context over a shared graph library and persister, with a
/// zero-wait retry pattern so suspended tasks are due immediately.
pub fn runner_ctx(library: Arc<GraphLibrary>, persister: Arc<MemoryPersister>) -> RunnerContext {
    RunnerContext::new(library, persister, Arc::new(ConstantPattern::new(0)))
}
