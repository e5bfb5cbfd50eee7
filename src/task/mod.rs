// ABOUTME: Durable task snapshot and append-only step audit records
// ABOUTME: The wire shape persisted by the Task Persister between hops

pub mod model;
pub mod step;

pub use model::{Task, TaskStatus};
pub use step::TaskStep;
