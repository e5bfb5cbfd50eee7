// ABOUTME: Activity trait and the closed set of activity outcomes
// ABOUTME: Every node executes one activity which reports exactly one ActivityResult

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::WorkFlow;

/// Outcome of one node's activity. The set is closed: routing tables map
/// each variant to an optional successor, and every dispatch site matches
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityResult {
    Success,
    Fail,
    Suspend,
    Unknown,
    Check,
    Condition,
}

impl ActivityResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityResult::Success => "SUCCESS",
            ActivityResult::Fail => "FAIL",
            ActivityResult::Suspend => "SUSPEND",
            ActivityResult::Unknown => "UNKNOWN",
            ActivityResult::Check => "CHECK",
            ActivityResult::Condition => "CONDITION",
        }
    }
}

impl std::fmt::Display for ActivityResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The unit of business logic attached to a node.
///
/// Activities read and write resources through the execution context handle
/// they are given. Local callers see activity errors propagated; distributed
/// runners treat them as a recoverable suspend.
#[async_trait]
pub trait Activity: Send + Sync {
    async fn execute(&self, context: &WorkFlow) -> anyhow::Result<ActivityResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_display_roundtrip() {
        let all = [
            ActivityResult::Success,
            ActivityResult::Fail,
            ActivityResult::Suspend,
            ActivityResult::Unknown,
            ActivityResult::Check,
            ActivityResult::Condition,
        ];

        for outcome in all {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(json, format!("\"{}\"", outcome.as_str()));

            let back: ActivityResult = serde_json::from_str(&json).unwrap();
            assert_eq!(back, outcome);
        }
    }
}
