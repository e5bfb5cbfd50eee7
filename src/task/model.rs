// ABOUTME: The Task entity: a durable, resumable snapshot of one distributed execution
// ABOUTME: Mutated at every hop by whichever runner currently holds its lease

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Initiated,
    Processing,
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Terminal tasks leave the active working set and are never retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Initiated => write!(f, "INITIATED"),
            TaskStatus::Processing => write!(f, "PROCESSING"),
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Completed => write!(f, "COMPLETED"),
            TaskStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Durable snapshot of one distributed execution.
///
/// Status moves forward except for the PROCESSING <-> PENDING retry loop.
/// Serialized field names follow the wire contract consumed by persistence
/// backends and interop tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub application: String,
    pub graph_name: String,
    pub node_name: String,
    pub status: TaskStatus,
    pub retry_times: u32,
    pub last_execution_time: Option<DateTime<Utc>>,
    pub next_execution_time: Option<DateTime<Utc>>,
    pub primary_resource: Option<String>,
    pub transfer_data: Option<String>,
}

impl Task {
    pub fn new(
        application: impl Into<String>,
        graph_name: impl Into<String>,
        node_name: impl Into<String>,
    ) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            application: application.into(),
            graph_name: graph_name.into(),
            node_name: node_name.into(),
            status: TaskStatus::Initiated,
            retry_times: 0,
            last_execution_time: None,
            next_execution_time: None,
            primary_resource: None,
            transfer_data: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_processing(&mut self) {
        self.status = TaskStatus::Processing;
        self.last_execution_time = Some(Utc::now());
    }

    /// Park the task for retry: PENDING with a due time `interval_millis`
    /// from now.
    pub fn mark_pending(&mut self, interval_millis: u64) {
        self.status = TaskStatus::Pending;
        self.last_execution_time = Some(Utc::now());
        self.next_execution_time = Some(Utc::now() + Duration::milliseconds(interval_millis as i64));
    }

    pub fn mark_completed(&mut self) {
        self.status = TaskStatus::Completed;
        self.last_execution_time = Some(Utc::now());
        self.next_execution_time = None;
    }

    pub fn mark_failed(&mut self) {
        self.status = TaskStatus::Failed;
        self.last_execution_time = Some(Utc::now());
        self.next_execution_time = None;
    }

    /// Move the snapshot to the next node. Advancing past a node resets the
    /// retry counter: the counter bounds retries per stuck node, not per
    /// task lifetime.
    pub fn advance_to(&mut self, node_name: impl Into<String>) {
        self.node_name = node_name.into();
        self.retry_times = 0;
        self.status = TaskStatus::Processing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_field_names() {
        let mut task = Task::new("billing", "order_flow", "n1");
        task.primary_resource = Some("{\"id\":1}".to_string());

        let json = serde_json::to_value(&task).unwrap();
        for field in [
            "taskId",
            "application",
            "graphName",
            "nodeName",
            "status",
            "retryTimes",
            "lastExecutionTime",
            "nextExecutionTime",
            "primaryResource",
            "transferData",
        ] {
            assert!(json.get(field).is_some(), "missing wire field {field}");
        }
        assert_eq!(json["status"], "INITIATED");
    }

    #[test]
    fn test_pending_sets_due_time() {
        let mut task = Task::new("billing", "order_flow", "n1");
        let before = Utc::now();
        task.mark_pending(5_000);

        assert_eq!(task.status, TaskStatus::Pending);
        let due = task.next_execution_time.unwrap();
        assert!(due >= before + Duration::milliseconds(5_000));
        assert!(due <= Utc::now() + Duration::milliseconds(5_000));
    }

    #[test]
    fn test_advance_resets_retry_counter() {
        let mut task = Task::new("billing", "order_flow", "n1");
        task.retry_times = 7;
        task.advance_to("n2");

        assert_eq!(task.node_name, "n2");
        assert_eq!(task.retry_times, 0);
        assert_eq!(task.status, TaskStatus::Processing);
    }

    #[test]
    fn test_terminal_states() {
        let mut task = Task::new("billing", "order_flow", "n1");
        assert!(!task.is_terminal());
        task.mark_completed();
        assert!(task.is_terminal());
        task.mark_failed();
        assert!(task.is_terminal());
    }
}
