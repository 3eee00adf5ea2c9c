//! Per-tenant sequence allocation.
//!
//! Allocates strictly increasing, gap-free sequence numbers under
//! contention. Counters track the highest *allocated* value, which may
//! briefly exceed the highest committed value while a writer is between
//! allocation and persist.

use crate::core::{Error, Result};
use crate::record::TenantId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Monotonic per-tenant counters.
pub struct SequenceManager {
    counters: RwLock<HashMap<TenantId, u64>>,
}

impl SequenceManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate the next sequence number for a tenant.
    ///
    /// Atomic with respect to all other callers: two concurrent calls never
    /// return the same value, and values are contiguous from 1.
    pub async fn next(&self, tenant: &TenantId) -> u64 {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(tenant.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Highest allocated sequence number, `None` if nothing was allocated.
    pub async fn current(&self, tenant: &TenantId) -> Option<u64> {
        let counters = self.counters.read().await;
        counters.get(tenant).copied().filter(|c| *c > 0)
    }

    /// Ensure a counter exists for the tenant without allocating.
    pub async fn initialize(&self, tenant: &TenantId) {
        let mut counters = self.counters.write().await;
        counters.entry(tenant.clone()).or_insert(0);
    }

    /// Force a tenant's counter to an arbitrary value.
    ///
    /// Test-only escape hatch. Setting a counter below the committed chain
    /// tail makes the next allocation collide with a stored record.
    pub async fn reset(&self, tenant: &TenantId, to: u64) {
        let mut counters = self.counters.write().await;
        counters.insert(tenant.clone(), to);
    }

    /// Roll back the latest allocation after a failed persist.
    ///
    /// Only the most recent allocation can be aborted; the engine holds the
    /// tenant write lock, so this is always the in-flight one.
    pub(crate) async fn abort(&self, tenant: &TenantId, sequence: u64) -> Result<()> {
        let mut counters = self.counters.write().await;
        match counters.get_mut(tenant) {
            Some(counter) if *counter == sequence => {
                *counter -= 1;
                Ok(())
            }
            _ => Err(Error::SequenceRollback {
                tenant: tenant.to_string(),
                sequence,
            }),
        }
    }
}

impl Default for SequenceManager {
    fn default() -> Self {
        Self::new()
    }
}
