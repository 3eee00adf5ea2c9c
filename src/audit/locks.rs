//! Per-tenant write locks.
//!
//! Writes for one tenant are serialized; writes across tenants run in
//! parallel. The registry hands out one shared mutex per tenant.

use crate::record::TenantId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Lock registry keyed by tenant id.
pub struct TenantLocks {
    inner: RwLock<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Get the lock for a tenant, creating it on first use.
    pub async fn handle(&self, tenant: &TenantId) -> Arc<Mutex<()>> {
        {
            let map = self.inner.read().await;
            if let Some(lock) = map.get(tenant) {
                return lock.clone();
            }
        }

        let mut map = self.inner.write().await;
        map.entry(tenant.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for TenantLocks {
    fn default() -> Self {
        Self::new()
    }
}
