// ABOUTME: Local synchronous graph traversal engine
// ABOUTME: Walks a graph to completion on the caller's task, with loop detection and async fan-out

pub mod circuit;
pub mod error;
pub mod executor;

pub use circuit::{Circuit, CircuitDetector, TripletDetector};
pub use error::{EngineError, Result};
pub use executor::LocalEngine;
