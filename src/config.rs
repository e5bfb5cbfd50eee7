// ABOUTME: Engine configuration loaded from YAML files and environment variables
// ABOUTME: Environment variables (SWITCHYARD_*) take precedence over file values

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bound of the shared worker pool used by runners and async
    /// dependencies.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_fast_scan_millis")]
    pub fast_scan_millis: u64,

    #[serde(default = "default_medium_scan_millis")]
    pub medium_scan_millis: u64,

    #[serde(default = "default_slow_scan_millis")]
    pub slow_scan_millis: u64,

    /// Lease time-to-live for the distributed lock.
    #[serde(default = "default_lease_ttl_millis")]
    pub lease_ttl_millis: u64,

    /// Suspend wait used by the local engine when an execution carries no
    /// timeout resource.
    #[serde(default = "default_suspend_timeout_millis")]
    pub default_suspend_timeout_millis: u64,
}

fn default_max_workers() -> usize {
    8
}

fn default_fast_scan_millis() -> u64 {
    1_000
}

fn default_medium_scan_millis() -> u64 {
    5_000
}

fn default_slow_scan_millis() -> u64 {
    30_000
}

fn default_lease_ttl_millis() -> u64 {
    60_000
}

fn default_suspend_timeout_millis() -> u64 {
    1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            fast_scan_millis: default_fast_scan_millis(),
            medium_scan_millis: default_medium_scan_millis(),
            slow_scan_millis: default_slow_scan_millis(),
            lease_ttl_millis: default_lease_ttl_millis(),
            default_suspend_timeout_millis: default_suspend_timeout_millis(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file path or default locations, then merge
    /// environment variables on top.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| PathBuf::from("switchyard.yaml"));

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Self::default()
        };

        config.merge_env()?;
        Ok(config)
    }

    fn merge_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("SWITCHYARD_MAX_WORKERS") {
            self.max_workers = value.parse()?;
        }
        if let Ok(value) = std::env::var("SWITCHYARD_FAST_SCAN_MILLIS") {
            self.fast_scan_millis = value.parse()?;
        }
        if let Ok(value) = std::env::var("SWITCHYARD_MEDIUM_SCAN_MILLIS") {
            self.medium_scan_millis = value.parse()?;
        }
        if let Ok(value) = std::env::var("SWITCHYARD_SLOW_SCAN_MILLIS") {
            self.slow_scan_millis = value.parse()?;
        }
        if let Ok(value) = std::env::var("SWITCHYARD_LEASE_TTL_MILLIS") {
            self.lease_ttl_millis = value.parse()?;
        }
        if let Ok(value) = std::env::var("SWITCHYARD_SUSPEND_TIMEOUT_MILLIS") {
            self.default_suspend_timeout_millis = value.parse()?;
        }
        Ok(())
    }

    pub fn scan_intervals(&self) -> crate::scan::ScanIntervals {
        crate::scan::ScanIntervals {
            fast: Duration::from_millis(self.fast_scan_millis),
            medium: Duration::from_millis(self.medium_scan_millis),
            slow: Duration::from_millis(self.slow_scan_millis),
        }
    }
}
