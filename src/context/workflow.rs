// ABOUTME: The WorkFlow execution context: one logical run on one thread of control
// ABOUTME: Cloneable handle over shared state so async-dependency workers can report back

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::{ContextError, Result};
use super::resource::{Resource, PRIMARY_REFERENCE, TIME_OUT_REFERENCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkFlowStatus {
    Waiting,
    Working,
    Closed,
}

impl std::fmt::Display for WorkFlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkFlowStatus::Waiting => write!(f, "WAITING"),
            WorkFlowStatus::Working => write!(f, "WORKING"),
            WorkFlowStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// One entry in the ordered, human-readable audit log of an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl std::fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.at.to_rfc3339(), self.message)
    }
}

#[derive(Debug, Default)]
struct WorkFlowShared {
    status: Option<WorkFlowStatus>,
    resources: HashMap<String, Resource>,
    primary_attached: bool,
    audit_log: Vec<AuditRecord>,
    visited_graphs: Vec<String>,
    reboot_requested: bool,
}

/// Execution context for one logical run of one or more graphs.
///
/// The handle is cheap to clone; clones share the same underlying state so
/// that cascaded sub-graph executions and async-dependency workers see one
/// resource map. A run is owned by a single thread of control — the shared
/// lock exists for the async-dependency fan-out, not for concurrent runs.
#[derive(Debug, Clone)]
pub struct WorkFlow {
    run_id: String,
    application: String,
    created_at: DateTime<Utc>,
    shared: Arc<RwLock<WorkFlowShared>>,
}

impl WorkFlow {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            application: application.into(),
            created_at: Utc::now(),
            shared: Arc::new(RwLock::new(WorkFlowShared {
                status: Some(WorkFlowStatus::Waiting),
                ..Default::default()
            })),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn status(&self) -> WorkFlowStatus {
        self.shared
            .read()
            .await
            .status
            .unwrap_or(WorkFlowStatus::Closed)
    }

    /// Move the context into WORKING. Transitions are forward-only:
    /// WAITING -> WORKING is valid, an already-working context is left
    /// untouched (cascaded executions), and a closed context is refused.
    pub async fn mark_working(&self) -> Result<()> {
        let mut shared = self.shared.write().await;
        match shared.status {
            Some(WorkFlowStatus::Waiting) => {
                shared.status = Some(WorkFlowStatus::Working);
                Ok(())
            }
            Some(WorkFlowStatus::Working) => Ok(()),
            _ => Err(ContextError::ContextClosed),
        }
    }

    pub async fn close(&self) {
        let mut shared = self.shared.write().await;
        shared.status = Some(WorkFlowStatus::Closed);
    }

    pub async fn is_closed(&self) -> bool {
        self.status().await == WorkFlowStatus::Closed
    }

    /// Attach the single primary resource into the reserved slot.
    ///
    /// Settable exactly once: a second attempt fails and leaves the first
    /// value untouched.
    pub async fn attach_primary(&self, resource: Resource) -> Result<()> {
        let mut shared = self.shared.write().await;
        if shared.primary_attached {
            let existing = shared
                .resources
                .get(PRIMARY_REFERENCE)
                .map(|r| r.reference.clone())
                .unwrap_or_else(|| PRIMARY_REFERENCE.to_string());
            return Err(ContextError::PrimaryAlreadyAttached { existing });
        }

        shared.primary_attached = true;
        shared.resources.insert(
            PRIMARY_REFERENCE.to_string(),
            Resource {
                reference: PRIMARY_REFERENCE.to_string(),
                ..resource
            },
        );
        Ok(())
    }

    pub async fn primary(&self) -> Option<Resource> {
        self.shared
            .read()
            .await
            .resources
            .get(PRIMARY_REFERENCE)
            .cloned()
    }

    pub async fn add_resource(&self, resource: Resource) {
        let mut shared = self.shared.write().await;
        shared.resources.insert(resource.reference.clone(), resource);
    }

    pub async fn get_resource(&self, reference: &str) -> Option<Resource> {
        self.shared.read().await.resources.get(reference).cloned()
    }

    pub async fn remove_resource(&self, reference: &str) -> Option<Resource> {
        self.shared.write().await.resources.remove(reference)
    }

    /// The suspend interval from the reserved timeout slot, when present.
    pub async fn suspend_interval_millis(&self) -> Option<u64> {
        self.get_resource(TIME_OUT_REFERENCE)
            .await
            .and_then(|r| r.value.as_u64())
    }

    pub async fn audit(&self, message: impl Into<String>) {
        let mut shared = self.shared.write().await;
        shared.audit_log.push(AuditRecord {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub async fn audit_log(&self) -> Vec<AuditRecord> {
        self.shared.read().await.audit_log.clone()
    }

    pub async fn visit_graph(&self, graph_name: impl Into<String>) {
        let mut shared = self.shared.write().await;
        shared.visited_graphs.push(graph_name.into());
    }

    pub async fn visited_graphs(&self) -> Vec<String> {
        self.shared.read().await.visited_graphs.clone()
    }

    pub async fn request_reboot(&self) {
        let mut shared = self.shared.write().await;
        shared.reboot_requested = true;
    }

    pub async fn reboot_requested(&self) -> bool {
        self.shared.read().await.reboot_requested
    }

    /// Tear the context down: drop all state and close it. After a reboot
    /// the handle reports CLOSED and holds no resources.
    pub async fn reboot(&self) {
        let mut shared = self.shared.write().await;
        shared.resources.clear();
        shared.primary_attached = false;
        shared.visited_graphs.clear();
        shared.reboot_requested = false;
        shared.status = Some(WorkFlowStatus::Closed);
    }

    /// Serialize every non-primary resource for persistence as transfer
    /// data. The primary resource travels separately on the Task snapshot.
    pub async fn export_resources(&self) -> Result<String> {
        let shared = self.shared.read().await;
        let transferable: HashMap<&String, &Resource> = shared
            .resources
            .iter()
            .filter(|(reference, _)| reference.as_str() != PRIMARY_REFERENCE)
            .collect();
        Ok(serde_json::to_string(&transferable)?)
    }

    /// Restore resources from persisted transfer data. Existing slots with
    /// the same reference are replaced; the primary slot is never imported.
    pub async fn import_resources(&self, transfer_data: &str) -> Result<()> {
        let imported: HashMap<String, Resource> = serde_json::from_str(transfer_data)?;
        let mut shared = self.shared.write().await;
        for (reference, resource) in imported {
            if reference == PRIMARY_REFERENCE {
                continue;
            }
            shared.resources.insert(reference, resource);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_primary_resource_attach_once() {
        let workflow = WorkFlow::new("test-app");

        let first = Resource::new("order-1", json!({"id": 1}), "order");
        workflow.attach_primary(first).await.unwrap();

        let second = Resource::new("order-2", json!({"id": 2}), "order");
        let err = workflow.attach_primary(second).await.unwrap_err();
        assert!(matches!(err, ContextError::PrimaryAlreadyAttached { .. }));

        // First value must be untouched.
        let primary = workflow.primary().await.unwrap();
        assert_eq!(primary.value, json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_status_transitions_forward_only() {
        let workflow = WorkFlow::new("test-app");
        assert_eq!(workflow.status().await, WorkFlowStatus::Waiting);

        workflow.mark_working().await.unwrap();
        assert_eq!(workflow.status().await, WorkFlowStatus::Working);

        // Re-entering WORKING is fine for cascaded executions.
        workflow.mark_working().await.unwrap();

        workflow.close().await;
        assert!(workflow.mark_working().await.is_err());
    }

    #[tokio::test]
    async fn test_clone_shares_resource_map() {
        let workflow = WorkFlow::new("test-app");
        let clone = workflow.clone();

        clone
            .add_resource(Resource::new("shared", json!("value"), "string"))
            .await;

        let seen = workflow.get_resource("shared").await.unwrap();
        assert_eq!(seen.value, json!("value"));
    }

    #[tokio::test]
    async fn test_export_import_skips_primary() {
        let workflow = WorkFlow::new("test-app");
        workflow
            .attach_primary(Resource::new("order", json!({"id": 7}), "order"))
            .await
            .unwrap();
        workflow
            .add_resource(Resource::new("step-output", json!(42), "number"))
            .await;

        let exported = workflow.export_resources().await.unwrap();

        let restored = WorkFlow::new("test-app");
        restored.import_resources(&exported).await.unwrap();

        assert!(restored.get_resource("step-output").await.is_some());
        assert!(restored.primary().await.is_none());
    }

    #[tokio::test]
    async fn test_reboot_clears_state() {
        let workflow = WorkFlow::new("test-app");
        workflow
            .attach_primary(Resource::new("order", json!(1), "order"))
            .await
            .unwrap();
        workflow.audit("ran something").await;
        workflow.visit_graph("g1").await;

        workflow.reboot().await;

        assert!(workflow.is_closed().await);
        assert!(workflow.primary().await.is_none());
        assert!(workflow.visited_graphs().await.is_empty());
        // Audit log survives the reboot for post-mortem inspection.
        assert_eq!(workflow.audit_log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_suspend_interval_reads_reserved_slot() {
        let workflow = WorkFlow::new("test-app");
        assert_eq!(workflow.suspend_interval_millis().await, None);

        workflow.add_resource(Resource::timeout(250)).await;
        assert_eq!(workflow.suspend_interval_millis().await, Some(250));
    }
}
