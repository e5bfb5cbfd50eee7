// ABOUTME: Static workflow graph model and activity contracts
// ABOUTME: Defines graphs, nodes, outcome routing, and the named graph library

pub mod activity;
pub mod error;
pub mod library;
pub mod model;

pub use activity::{Activity, ActivityResult};
pub use error::{GraphError, Result};
pub use library::GraphLibrary;
pub use model::{Graph, NextSteps, Node};
