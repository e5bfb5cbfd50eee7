// ABOUTME: Pluggable backoff policies mapping retry count to wait interval
// ABOUTME: Includes the global retry ceiling shared by every distributed runner

pub mod pattern;

pub use pattern::{ConstantPattern, RetryPattern, WideningPattern, MAX_RETRY_TIMES};
