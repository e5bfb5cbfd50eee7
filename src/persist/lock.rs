// ABOUTME: Lease-based distributed lock contract and an in-memory lease table
// ABOUTME: Leases carry owner identity and expiry; expired leases are stealable

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::Result;

/// Time-bounded, refreshable ownership token guarding mutation of one task.
///
/// Semantics every backend must honor:
/// - `try_acquire` is reentrant for the current owner and steals leases
///   whose expiry has passed (dead-owner takeover).
/// - `refresh` extends only a live lease held by the caller.
/// - `release` by a non-owner is a silent no-op.
/// - lease expiry is the only cancellation mechanism; there is no
///   preemptive interrupt of an in-flight activity.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    async fn try_acquire(&self, key: &str, owner: &str, ttl_millis: u64) -> Result<bool>;
    async fn refresh(&self, key: &str, owner: &str, ttl_millis: u64) -> Result<bool>;
    async fn release(&self, key: &str, owner: &str) -> Result<()>;
    async fn is_owned_by(&self, key: &str, owner: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
struct Lease {
    owner: String,
    expires_at: DateTime<Utc>,
}

impl Lease {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory lock built from a conditional-set over a single map, the same
/// primitive a key-value store backend would use.
#[derive(Debug, Default)]
pub struct LeaseTable {
    leases: Mutex<HashMap<String, Lease>>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for LeaseTable {
    async fn try_acquire(&self, key: &str, owner: &str, ttl_millis: u64) -> Result<bool> {
        let now = Utc::now();
        let mut leases = self.leases.lock().await;

        match leases.get(key) {
            Some(lease) if lease.owner != owner && !lease.is_expired(now) => Ok(false),
            existing => {
                if let Some(lease) = existing {
                    if lease.owner != owner {
                        debug!(key, previous = %lease.owner, owner, "stole expired lease");
                    }
                }
                leases.insert(
                    key.to_string(),
                    Lease {
                        owner: owner.to_string(),
                        expires_at: now + Duration::milliseconds(ttl_millis as i64),
                    },
                );
                Ok(true)
            }
        }
    }

    async fn refresh(&self, key: &str, owner: &str, ttl_millis: u64) -> Result<bool> {
        let now = Utc::now();
        let mut leases = self.leases.lock().await;

        match leases.get_mut(key) {
            Some(lease) if lease.owner == owner && !lease.is_expired(now) => {
                lease.expires_at = now + Duration::milliseconds(ttl_millis as i64);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<()> {
        let mut leases = self.leases.lock().await;
        if let Some(lease) = leases.get(key) {
            if lease.owner == owner {
                leases.remove(key);
            }
        }
        Ok(())
    }

    async fn is_owned_by(&self, key: &str, owner: &str) -> Result<bool> {
        let now = Utc::now();
        let leases = self.leases.lock().await;
        Ok(leases
            .get(key)
            .map(|lease| lease.owner == owner && !lease.is_expired(now))
            .unwrap_or(false))
    }
}
