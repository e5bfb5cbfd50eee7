// ABOUTME: Process-wide registry of live execution contexts keyed by run id
// ABOUTME: A lookup convenience for node code; engines always pass the handle explicitly

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};
use tracing::debug;

use super::workflow::WorkFlow;

static REGISTRY: OnceLock<RwLock<HashMap<String, WorkFlow>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, WorkFlow>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a context before its first node executes.
pub fn set_up(workflow: &WorkFlow) {
    let mut map = registry().write().expect("execution registry lock poisoned");
    debug!(run_id = workflow.run_id(), "registered execution context");
    map.insert(workflow.run_id().to_string(), workflow.clone());
}

/// Look up a live execution by run id.
pub fn current(run_id: &str) -> Option<WorkFlow> {
    let map = registry().read().expect("execution registry lock poisoned");
    map.get(run_id).cloned()
}

/// Discard a context at the end of its run: removes it from the registry
/// and tears down its state. Returns the handle that was removed, if any.
pub async fn reboot(run_id: &str) -> Option<WorkFlow> {
    let removed = {
        let mut map = registry().write().expect("execution registry lock poisoned");
        map.remove(run_id)
    };

    if let Some(workflow) = &removed {
        workflow.reboot().await;
        debug!(run_id, "rebooted execution context");
    }
    removed
}

pub fn active_count() -> usize {
    registry().read().expect("execution registry lock poisoned").len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_up_current_reboot_cycle() {
        let workflow = WorkFlow::new("registry-test");
        let run_id = workflow.run_id().to_string();

        set_up(&workflow);
        let found = current(&run_id).expect("context should be registered");
        assert_eq!(found.run_id(), run_id);

        let removed = reboot(&run_id).await.expect("context should be removed");
        assert!(removed.is_closed().await);
        assert!(current(&run_id).is_none());
    }

    #[tokio::test]
    async fn test_reboot_unknown_run_is_none() {
        assert!(reboot("no-such-run").await.is_none());
    }
}
