// ABOUTME: Named resources flowing through one execution
// ABOUTME: Defines the reserved resource reference namespace other components rely on

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved slot holding the per-step suspend timeout in milliseconds.
pub const TIME_OUT_REFERENCE: &str = "TIME_OUT_REFERENCE";

/// Reserved slot holding the single caller-supplied primary resource.
pub const PRIMARY_REFERENCE: &str = "PRIMARY_REFERENCE";

/// Derived slot under which an async-dependency node reports its outcome.
///
/// This is a load-bearing string contract: nodes that want to block on an
/// async dependency look its result up under this key.
pub fn async_task_reference(node_name: &str) -> String {
    format!("{node_name}::async::task")
}

/// A named value in the execution's resource map. The reference is unique
/// within one execution; inserting the same reference again replaces the
/// previous value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub reference: String,
    pub value: Value,
    pub resource_type: String,
}

impl Resource {
    pub fn new(
        reference: impl Into<String>,
        value: Value,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            value,
            resource_type: resource_type.into(),
        }
    }

    /// A suspend-timeout resource for the reserved `TIME_OUT_REFERENCE` slot.
    pub fn timeout(millis: u64) -> Self {
        Self::new(TIME_OUT_REFERENCE, Value::from(millis), "timeout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_task_reference_shape() {
        assert_eq!(async_task_reference("notify"), "notify::async::task");
    }

    #[test]
    fn test_timeout_resource_uses_reserved_slot() {
        let resource = Resource::timeout(1500);
        assert_eq!(resource.reference, TIME_OUT_REFERENCE);
        assert_eq!(resource.value, serde_json::json!(1500));
    }
}
