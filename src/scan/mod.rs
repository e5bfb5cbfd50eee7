// ABOUTME: Multi-cadence polling scanners that discover tasks pending retry
// ABOUTME: Feeds every discovered task id to a retry runner on the shared pool

pub mod scheduler;

pub use scheduler::{ScanIntervals, ScanScheduler};
