//! In-memory storage backend.
//!
//! Reference implementation of [`AuditStorage`] over tokio-synchronized
//! maps. Chains are keyed by sequence number per tenant, with a global id
//! index for point lookups.

use crate::chain::hasher::record_hash_matches;
use crate::core::{Error, Result, Timestamp};
use crate::record::{AuditRecord, RecordId, TenantId};
use crate::storage::backend::AuditStorage;
use crate::storage::query::RecordQuery;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct StoreInner {
    /// Per-tenant chains, ordered by sequence number.
    chains: HashMap<TenantId, BTreeMap<u64, AuditRecord>>,
    /// Record id -> (tenant, sequence) index.
    by_id: HashMap<String, (TenantId, u64)>,
}

/// In-memory audit record store.
pub struct MemoryStorage {
    inner: RwLock<StoreInner>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Total number of stored records.
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.by_id.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Overwrite a stored record in place, bypassing the append-only
    /// contract. Exists so tests can simulate out-of-band tampering.
    #[cfg(test)]
    pub(crate) async fn tamper<F>(&self, id: &RecordId, mutate: F)
    where
        F: FnOnce(&mut AuditRecord),
    {
        let mut inner = self.inner.write().await;
        if let Some((tenant, sequence)) = inner.by_id.get(id.as_str()).cloned() {
            if let Some(chain) = inner.chains.get_mut(&tenant) {
                if let Some(record) = chain.get_mut(&sequence) {
                    mutate(record);
                }
            }
        }
    }

    /// Remove a record outright, bypassing retention. Exists so tests can
    /// simulate a sequence gap.
    #[cfg(test)]
    pub(crate) async fn remove(&self, id: &RecordId) {
        let mut inner = self.inner.write().await;
        if let Some((tenant, sequence)) = inner.by_id.remove(id.as_str()) {
            if let Some(chain) = inner.chains.get_mut(&tenant) {
                chain.remove(&sequence);
            }
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, record: AuditRecord) -> Result<RecordId> {
        if record.sequence_number == 0 {
            return Err(Error::StorageFailure(
                "sequence numbers start at 1".to_string(),
            ));
        }

        let mut inner = self.inner.write().await;
        if inner.by_id.contains_key(record.id.as_str()) {
            return Err(Error::StorageFailure(format!(
                "duplicate record id {}",
                record.id
            )));
        }

        let chain = inner.chains.entry(record.tenant_id.clone()).or_default();
        if chain.contains_key(&record.sequence_number) {
            return Err(Error::DuplicateSequence {
                tenant: record.tenant_id.to_string(),
                sequence: record.sequence_number,
            });
        }

        let id = record.id.clone();
        let key = (record.tenant_id.clone(), record.sequence_number);
        debug!(
            tenant = %record.tenant_id,
            sequence = record.sequence_number,
            record_id = %id,
            "record stored"
        );
        chain.insert(record.sequence_number, record);
        inner.by_id.insert(id.as_str().to_string(), key);

        Ok(id)
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<AuditRecord>> {
        let inner = self.inner.read().await;
        let record = inner
            .by_id
            .get(id.as_str())
            .and_then(|(tenant, sequence)| inner.chains.get(tenant)?.get(sequence));

        match record {
            Some(record) => {
                // The read path re-verifies; a stale hash means the store
                // was modified out of band.
                if !record_hash_matches(record) {
                    return Err(Error::Tampered {
                        record_id: id.to_string(),
                        reason: "stored hash does not match recomputation".to_string(),
                    });
                }
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn find_by_subject(
        &self,
        tenant: &TenantId,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chains
            .get(tenant)
            .map(|chain| {
                chain
                    .values()
                    .filter(|r| {
                        r.subject_type.as_deref() == Some(subject_type)
                            && r.subject_id.as_deref() == Some(subject_id)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_causer(
        &self,
        tenant: &TenantId,
        causer_type: &str,
        causer_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chains
            .get(tenant)
            .map(|chain| {
                chain
                    .values()
                    .filter(|r| {
                        r.causer_type.as_deref() == Some(causer_type)
                            && r.causer_id.as_deref() == Some(causer_id)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_by_tenant_sequence(&self, tenant: &TenantId) -> Result<Vec<AuditRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chains
            .get(tenant)
            .map(|chain| chain.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_last_record(&self, tenant: &TenantId) -> Result<Option<AuditRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chains
            .get(tenant)
            .and_then(|chain| chain.values().next_back().cloned()))
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<AuditRecord>> {
        let inner = self.inner.read().await;
        let mut results: Vec<AuditRecord> = inner
            .chains
            .values()
            .flat_map(|chain| chain.values())
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            (a.tenant_id.as_str(), a.sequence_number)
                .cmp(&(b.tenant_id.as_str(), b.sequence_number))
        });

        let offset = query.offset.unwrap_or(0);
        let results: Vec<AuditRecord> = match query.limit {
            Some(limit) => results.into_iter().skip(offset).take(limit).collect(),
            None => results.into_iter().skip(offset).collect(),
        };

        Ok(results)
    }

    async fn find_expired(&self, now: Timestamp) -> Result<Vec<AuditRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .chains
            .values()
            .flat_map(|chain| chain.values())
            .filter(|r| r.is_expired(now))
            .cloned()
            .collect())
    }

    async fn count_expired(&self, now: Timestamp) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .chains
            .values()
            .flat_map(|chain| chain.values())
            .filter(|r| r.is_expired(now))
            .count() as u64)
    }

    async fn delete_expired(&self, ids: &[RecordId], now: Timestamp) -> Result<u64> {
        let mut inner = self.inner.write().await;

        // Validate the whole batch before touching anything.
        for id in ids {
            let (tenant, sequence) = inner
                .by_id
                .get(id.as_str())
                .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            let record = inner
                .chains
                .get(tenant)
                .and_then(|chain| chain.get(sequence))
                .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
            if !record.is_expired(now) {
                return Err(Error::RetentionNotElapsed(id.to_string()));
            }
        }

        let mut deleted = 0;
        for id in ids {
            if let Some((tenant, sequence)) = inner.by_id.remove(id.as_str()) {
                if let Some(chain) = inner.chains.get_mut(&tenant) {
                    if chain.remove(&sequence).is_some() {
                        deleted += 1;
                    }
                }
            }
        }

        debug!(deleted, "expired records purged");
        Ok(deleted)
    }
}
