// ABOUTME: The local engine: synchronous graph traversal on the caller's task
// ABOUTME: Handles suspend waits, async-dependency fan-out, loop detection, and cascades

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::circuit::{Circuit, CircuitDetector, TripletDetector};
use super::error::{EngineError, Result};
use crate::context::{async_task_reference, registry, Resource, WorkFlow};
use crate::graph::{ActivityResult, Graph, GraphLibrary, Node};
use crate::runner::WorkerPool;

const DEFAULT_SUSPEND_TIMEOUT_MILLIS: u64 = 1_000;

type DetectorFactory = Box<dyn Fn() -> Box<dyn CircuitDetector> + Send + Sync>;

/// Walks a graph synchronously using an execution context: one node at a
/// time on the calling task, with a real wait on SUSPEND outcomes. Callers
/// needing non-blocking behavior run it on a dedicated worker.
pub struct LocalEngine {
    library: Arc<GraphLibrary>,
    pool: Arc<WorkerPool>,
    default_suspend_timeout: Duration,
    detector_factory: DetectorFactory,
}

impl LocalEngine {
    pub fn new(library: Arc<GraphLibrary>, pool: Arc<WorkerPool>) -> Self {
        Self {
            library,
            pool,
            default_suspend_timeout: Duration::from_millis(DEFAULT_SUSPEND_TIMEOUT_MILLIS),
            detector_factory: Box::new(|| Box::new(TripletDetector::new())),
        }
    }

    pub fn with_default_suspend_timeout(mut self, timeout: Duration) -> Self {
        self.default_suspend_timeout = timeout;
        self
    }

    /// Replace the loop detector. The factory is invoked once per
    /// traversal, so each run starts with fresh detector state.
    pub fn with_detector<F, D>(mut self, factory: F) -> Self
    where
        F: Fn() -> D + Send + Sync + 'static,
        D: CircuitDetector + 'static,
    {
        self.detector_factory = Box::new(move || Box::new(factory()));
        self
    }

    /// Execute one full traversal of the named graph on the given context.
    ///
    /// The context must be set up by the caller; a primary resource, when
    /// needed, is attached before this call. Cascaded sub-graph executions
    /// call `run` again with the same context and `auto_clean = false` so
    /// they share one resource map. With `auto_clean = true` the context is
    /// closed and rebooted once traversal terminates.
    #[instrument(skip(self, workflow), fields(graph = graph_name, run_id = %workflow.run_id()))]
    pub async fn run(&self, graph_name: &str, workflow: &WorkFlow, auto_clean: bool) -> Result<()> {
        let graph = self.library.get(graph_name)?;

        workflow.mark_working().await?;
        workflow.visit_graph(graph_name).await;
        registry::set_up(workflow);

        info!("starting graph traversal");
        let mut detector = (self.detector_factory)();
        let mut previous_name = String::new();
        let mut current = Some(graph.start_node()?);

        while let Some(node) = current {
            if workflow.reboot_requested().await {
                info!(node = node.name(), "reboot requested, stopping traversal");
                break;
            }

            self.launch_async_dependencies(&graph, &node, workflow)?;
            self.launch_daemons(&graph, &node, workflow)?;

            let outcome = node
                .activity()
                .execute(workflow)
                .await
                .map_err(|source| EngineError::Activity {
                    graph: graph_name.to_string(),
                    node: node.name().to_string(),
                    source,
                })?;

            workflow
                .audit(format!(
                    "graph '{}' node '{}' -> {}",
                    graph_name,
                    node.name(),
                    outcome
                ))
                .await;
            debug!(node = node.name(), %outcome, "node executed");

            let next = graph.route(&node, outcome)?;
            let next_name = next
                .as_ref()
                .map(|n| n.name().to_string())
                .unwrap_or_default();

            if detector.record(&previous_name, &next_name, outcome) == Circuit::Open {
                warn!(
                    previous = previous_name,
                    next = next_name,
                    %outcome,
                    "open circuit detected, halting traversal"
                );
                workflow
                    .audit(format!(
                        "open circuit at '{}' -> '{}' on {}, traversal halted",
                        previous_name, next_name, outcome
                    ))
                    .await;
                break;
            }

            if outcome == ActivityResult::Suspend {
                let wait = workflow
                    .suspend_interval_millis()
                    .await
                    .map(Duration::from_millis)
                    .unwrap_or(self.default_suspend_timeout);
                debug!(node = node.name(), ?wait, "suspended, waiting");
                sleep(wait).await;
            }

            previous_name = node.name().to_string();
            current = next;
        }

        info!("graph traversal finished");

        if auto_clean {
            workflow.close().await;
            registry::reboot(workflow.run_id()).await;
        }
        Ok(())
    }

    /// Launch every async-dependency node of the host on the shared pool.
    ///
    /// Each reports its outcome (or failure) into the `<node>::async::task`
    /// slot of the shared resource map. The host traversal never waits for
    /// them; a later node that cares blocks on the resource key itself.
    fn launch_async_dependencies(
        &self,
        graph: &Arc<Graph>,
        node: &Node,
        workflow: &WorkFlow,
    ) -> Result<()> {
        for dep_name in node.async_dependencies() {
            let dep = graph.node(dep_name)?;
            let reference = async_task_reference(dep_name);
            let resource_type = graph.resource_type().to_string();
            let workflow = workflow.clone();

            self.pool.submit(async move {
                let value = match dep.activity().execute(&workflow).await {
                    Ok(outcome) => {
                        debug!(node = dep.name(), %outcome, "async dependency finished");
                        json!({ "outcome": outcome.as_str() })
                    }
                    Err(error) => {
                        // Failure stays isolated to this slot; the host
                        // traversal is unaffected unless it inspects it.
                        warn!(node = dep.name(), %error, "async dependency failed");
                        json!({ "error": error.to_string() })
                    }
                };
                workflow
                    .add_resource(Resource::new(reference, value, resource_type))
                    .await;
            });
        }
        Ok(())
    }

    /// Daemon nodes are fire-and-forget: launched alongside the host with
    /// no reporting into the resource map.
    fn launch_daemons(&self, graph: &Arc<Graph>, node: &Node, workflow: &WorkFlow) -> Result<()> {
        for daemon_name in node.daemon_nodes() {
            let daemon = graph.node(daemon_name)?;
            let workflow = workflow.clone();

            self.pool.submit(async move {
                match daemon.activity().execute(&workflow).await {
                    Ok(outcome) => debug!(node = daemon.name(), %outcome, "daemon finished"),
                    Err(error) => warn!(node = daemon.name(), %error, "daemon failed"),
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Activity, NextSteps};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        outcome: ActivityResult,
        visits: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Activity for Scripted {
        async fn execute(&self, _context: &WorkFlow) -> anyhow::Result<ActivityResult> {
            self.visits.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome)
        }
    }

    fn scripted(outcome: ActivityResult) -> (Arc<dyn Activity>, Arc<AtomicU32>) {
        let visits = Arc::new(AtomicU32::new(0));
        (
            Arc::new(Scripted {
                outcome,
                visits: Arc::clone(&visits),
            }),
            visits,
        )
    }

    fn engine_for(graph: Graph) -> LocalEngine {
        let library = Arc::new(GraphLibrary::new());
        library.register(graph).unwrap();
        LocalEngine::new(library, Arc::new(WorkerPool::new(4)))
    }

    #[tokio::test]
    async fn test_success_chain_visits_every_node() {
        let (a1, v1) = scripted(ActivityResult::Success);
        let (a2, v2) = scripted(ActivityResult::Success);

        let graph = Graph::new(
            "chain",
            "order",
            "n1",
            vec![
                Node::new("n1", a1)
                    .with_next_steps(NextSteps::new().on(ActivityResult::Success, "n2")),
                Node::new("n2", a2),
            ],
        );

        let engine = engine_for(graph);
        let workflow = WorkFlow::new("test");
        engine.run("chain", &workflow, false).await.unwrap();

        assert_eq!(v1.load(Ordering::SeqCst), 1);
        assert_eq!(v2.load(Ordering::SeqCst), 1);
        assert_eq!(workflow.audit_log().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cycle_halts_via_open_circuit() {
        let (a1, v1) = scripted(ActivityResult::Success);
        let (a2, _) = scripted(ActivityResult::Success);

        let graph = Graph::new(
            "loopy",
            "order",
            "a",
            vec![
                Node::new("a", a1)
                    .with_next_steps(NextSteps::new().on(ActivityResult::Success, "b")),
                Node::new("b", a2)
                    .with_next_steps(NextSteps::new().on(ActivityResult::Success, "a")),
            ],
        );

        let engine = engine_for(graph);
        let workflow = WorkFlow::new("test");

        // Must terminate rather than loop forever.
        engine.run("loopy", &workflow, false).await.unwrap();
        assert!(v1.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_injected_detector_bounds_traversal() {
        // Opens after allowing a fixed number of hops.
        struct TripWire {
            hops: u32,
        }

        impl CircuitDetector for TripWire {
            fn record(
                &mut self,
                _previous: &str,
                _next: &str,
                _outcome: ActivityResult,
            ) -> Circuit {
                if self.hops == 0 {
                    Circuit::Open
                } else {
                    self.hops -= 1;
                    Circuit::Closed
                }
            }
        }

        let (a1, v1) = scripted(ActivityResult::Success);
        let (a2, v2) = scripted(ActivityResult::Success);
        let (a3, v3) = scripted(ActivityResult::Success);

        let graph = Graph::new(
            "chain",
            "order",
            "n1",
            vec![
                Node::new("n1", a1)
                    .with_next_steps(NextSteps::new().on(ActivityResult::Success, "n2")),
                Node::new("n2", a2)
                    .with_next_steps(NextSteps::new().on(ActivityResult::Success, "n3")),
                Node::new("n3", a3),
            ],
        );

        let engine = engine_for(graph).with_detector(|| TripWire { hops: 1 });
        let workflow = WorkFlow::new("test");
        engine.run("chain", &workflow, false).await.unwrap();

        // The custom detector halted the walk before the third node.
        assert_eq!(v1.load(Ordering::SeqCst), 1);
        assert_eq!(v2.load(Ordering::SeqCst), 1);
        assert_eq!(v3.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_graph_is_fatal() {
        let library = Arc::new(GraphLibrary::new());
        let engine = LocalEngine::new(library, Arc::new(WorkerPool::new(1)));
        let workflow = WorkFlow::new("test");

        let err = engine.run("missing", &workflow, false).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Graph(crate::graph::GraphError::UnknownGraph { .. })
        ));
        // No partial state created.
        assert!(workflow.visited_graphs().await.is_empty());
    }

    #[tokio::test]
    async fn test_auto_clean_closes_and_reboots() {
        let (a1, _) = scripted(ActivityResult::Success);
        let graph = Graph::new("single", "order", "n1", vec![Node::new("n1", a1)]);

        let engine = engine_for(graph);
        let workflow = WorkFlow::new("test");
        engine.run("single", &workflow, true).await.unwrap();

        assert!(workflow.is_closed().await);
        assert!(registry::current(workflow.run_id()).is_none());
    }
}
