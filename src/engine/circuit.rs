// ABOUTME: Pluggable loop detection for graph traversal
// ABOUTME: A repeated (previous, next, outcome) triple within one traversal opens the circuit

use std::collections::HashSet;

use crate::graph::ActivityResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Circuit {
    Closed,
    Open,
}

/// Detects routing loops during one traversal. The engine records every hop;
/// an open circuit means the engine must stop advancing to guarantee
/// liveness on mis-configured graphs.
pub trait CircuitDetector: Send {
    fn record(&mut self, previous: &str, next: &str, outcome: ActivityResult) -> Circuit;
}

/// Default detector: remembers every (previous node, next node, outcome)
/// triple seen in the traversal and trips on the first repeat.
#[derive(Debug, Default)]
pub struct TripletDetector {
    seen: HashSet<(String, String, ActivityResult)>,
}

impl TripletDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CircuitDetector for TripletDetector {
    fn record(&mut self, previous: &str, next: &str, outcome: ActivityResult) -> Circuit {
        let triple = (previous.to_string(), next.to_string(), outcome);
        if self.seen.insert(triple) {
            Circuit::Closed
        } else {
            Circuit::Open
        }
    }
}
