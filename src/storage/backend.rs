//! AuditStorage trait definition.
//!
//! Append-only persistence contract. Insertion and lookup only; the single
//! deletion entry point is restricted to retention-expired records.

use crate::core::{Result, Timestamp};
use crate::record::{AuditRecord, RecordId, TenantId};
use crate::storage::query::RecordQuery;
use async_trait::async_trait;

/// Core trait for audit record stores.
///
/// Implementations must treat stored records as immutable: no update path
/// exists, and `delete_expired` must refuse records whose retention window
/// has not passed.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Persist a new record.
    ///
    /// Must reject a duplicate (tenant, sequence_number) pair and a
    /// duplicate record id.
    async fn store(&self, record: AuditRecord) -> Result<RecordId>;

    /// Read a record by ID, re-verifying its hash.
    ///
    /// Returns a `Tampered` error if the stored hash no longer matches a
    /// fresh recomputation.
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<AuditRecord>>;

    /// Records about an entity, ordered by sequence number.
    async fn find_by_subject(
        &self,
        tenant: &TenantId,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<AuditRecord>>;

    /// Records by an actor, ordered by sequence number.
    async fn find_by_causer(
        &self,
        tenant: &TenantId,
        causer_type: &str,
        causer_id: &str,
    ) -> Result<Vec<AuditRecord>>;

    /// A tenant's full chain, ordered by sequence number ascending.
    async fn find_by_tenant_sequence(&self, tenant: &TenantId) -> Result<Vec<AuditRecord>>;

    /// The record with the highest sequence number for a tenant.
    async fn get_last_record(&self, tenant: &TenantId) -> Result<Option<AuditRecord>>;

    /// Records matching a filter.
    async fn query(&self, query: &RecordQuery) -> Result<Vec<AuditRecord>>;

    /// Records whose retention window has passed.
    async fn find_expired(&self, now: Timestamp) -> Result<Vec<AuditRecord>>;

    /// Count of records whose retention window has passed.
    async fn count_expired(&self, now: Timestamp) -> Result<u64>;

    /// Delete the given records, refusing any that have not expired.
    ///
    /// The only mutation in the contract. Returns the number deleted.
    async fn delete_expired(&self, ids: &[RecordId], now: Timestamp) -> Result<u64>;
}
