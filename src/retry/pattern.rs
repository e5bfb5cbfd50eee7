// ABOUTME: Retry pattern implementations: constant interval and widening table
// ABOUTME: A pattern is a pure, total function over [0, MAX_RETRY_TIMES]

/// Global per-node retry ceiling. After this many suspends on one node the
/// outcome converts to FAIL and the task terminates.
pub const MAX_RETRY_TIMES: u32 = 24;

/// Pure backoff policy: `interval(retry_count)` returns the wait in
/// milliseconds before the next attempt. Must be total over the ceiling
/// range; per-node interval tables on `Node` take precedence when present.
pub trait RetryPattern: Send + Sync {
    fn interval(&self, retry_count: u32) -> u64;
}

/// Same wait for every retry.
#[derive(Debug, Clone)]
pub struct ConstantPattern {
    millis: u64,
}

impl ConstantPattern {
    pub fn new(millis: u64) -> Self {
        Self { millis }
    }
}

impl RetryPattern for ConstantPattern {
    fn interval(&self, _retry_count: u32) -> u64 {
        self.millis
    }
}

/// Monotonically-widening fixed table, growing from one second up to half an
/// hour. Counts past the table length are capped at the final entry, so the
/// last several retries all wait the maximum.
#[derive(Debug, Clone)]
pub struct WideningPattern {
    table: Vec<u64>,
}

impl Default for WideningPattern {
    fn default() -> Self {
        Self {
            table: vec![
                1_000,
                2_000,
                5_000,
                10_000,
                30_000,
                60_000,
                90_000,
                2 * 60_000,
                3 * 60_000,
                5 * 60_000,
                7 * 60_000,
                10 * 60_000,
                12 * 60_000,
                15 * 60_000,
                18 * 60_000,
                20 * 60_000,
                25 * 60_000,
                30 * 60_000,
                30 * 60_000,
                30 * 60_000,
                30 * 60_000,
                30 * 60_000,
                30 * 60_000,
                30 * 60_000,
            ],
        }
    }
}

impl WideningPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a custom table. Empty tables are rejected by falling back
    /// to the default.
    pub fn from_table(table: Vec<u64>) -> Self {
        if table.is_empty() {
            Self::default()
        } else {
            Self { table }
        }
    }
}

impl RetryPattern for WideningPattern {
    fn interval(&self, retry_count: u32) -> u64 {
        let index = (retry_count as usize).min(self.table.len() - 1);
        self.table[index]
    }
}
