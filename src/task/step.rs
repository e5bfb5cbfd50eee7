// ABOUTME: TaskStep: append-only audit record for one hop of a distributed task
// ABOUTME: Immutable once written; the full history survives terminal states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Task;
use crate::graph::ActivityResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStep {
    pub task_id: String,
    pub node_name: String,
    pub graph_name: String,
    pub outcome: ActivityResult,
    pub transfer_payload: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskStep {
    /// Record one hop of the given task.
    pub fn record(task: &Task, outcome: ActivityResult, transfer_payload: Option<String>) -> Self {
        Self {
            task_id: task.task_id.clone(),
            node_name: task.node_name.clone(),
            graph_name: task.graph_name.clone(),
            outcome,
            transfer_payload,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_captures_task_position() {
        let task = Task::new("billing", "order_flow", "charge");
        let step = TaskStep::record(&task, ActivityResult::Suspend, Some("{}".to_string()));

        assert_eq!(step.task_id, task.task_id);
        assert_eq!(step.node_name, "charge");
        assert_eq!(step.graph_name, "order_flow");
        assert_eq!(step.outcome, ActivityResult::Suspend);
    }
}
