//! Test doubles for the storage contract.

use crate::core::{Error, Result, Timestamp};
use crate::record::{AuditRecord, RecordId, TenantId};
use crate::storage::backend::AuditStorage;
use crate::storage::memory::MemoryStorage;
use crate::storage::query::RecordQuery;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Store double that fails `store` a set number of times, then delegates.
/// Pass `u32::MAX` for a store that never recovers.
pub(crate) struct FlakyStorage {
    inner: Arc<MemoryStorage>,
    failures_left: AtomicU32,
}

impl FlakyStorage {
    pub(crate) fn new(inner: Arc<MemoryStorage>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl AuditStorage for FlakyStorage {
    async fn store(&self, record: AuditRecord) -> Result<RecordId> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::StorageFailure("simulated outage".to_string()));
        }
        self.inner.store(record).await
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<AuditRecord>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_subject(
        &self,
        tenant: &TenantId,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        self.inner
            .find_by_subject(tenant, subject_type, subject_id)
            .await
    }

    async fn find_by_causer(
        &self,
        tenant: &TenantId,
        causer_type: &str,
        causer_id: &str,
    ) -> Result<Vec<AuditRecord>> {
        self.inner
            .find_by_causer(tenant, causer_type, causer_id)
            .await
    }

    async fn find_by_tenant_sequence(&self, tenant: &TenantId) -> Result<Vec<AuditRecord>> {
        self.inner.find_by_tenant_sequence(tenant).await
    }

    async fn get_last_record(&self, tenant: &TenantId) -> Result<Option<AuditRecord>> {
        self.inner.get_last_record(tenant).await
    }

    async fn query(&self, query: &RecordQuery) -> Result<Vec<AuditRecord>> {
        self.inner.query(query).await
    }

    async fn find_expired(&self, now: Timestamp) -> Result<Vec<AuditRecord>> {
        self.inner.find_expired(now).await
    }

    async fn count_expired(&self, now: Timestamp) -> Result<u64> {
        self.inner.count_expired(now).await
    }

    async fn delete_expired(&self, ids: &[RecordId], now: Timestamp) -> Result<u64> {
        self.inner.delete_expired(ids, now).await
    }
}
