//! Audit engine.
//!
//! Orchestrates the write paths. The critical section (allocate sequence,
//! read last hash, compute hash, sign, persist) runs under the tenant's
//! write lock, so each tenant has a single logical writer no matter how
//! many tasks call in.

use crate::audit::config::AuditConfig;
use crate::audit::locks::TenantLocks;
use crate::audit::queue::{AuditJob, JobId, JobQueue};
use crate::chain::hasher::{compute_record_hash, HashInput};
use crate::chain::SequenceManager;
use crate::core::{now, Error, Hash256, Result};
use crate::crypto::SignerKeyring;
use crate::record::{AuditLevel, AuditRecord, HashAlgorithm, RecordDraft, RecordId, TenantId};
use crate::storage::AuditStorage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// Committed job ids, the dedupe check behind at-least-once delivery.
struct JobLedger {
    inner: RwLock<HashMap<String, RecordId>>,
}

impl JobLedger {
    fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, job: &JobId) -> Option<RecordId> {
        self.inner.read().await.get(job.as_str()).cloned()
    }

    async fn insert(&self, job: &JobId, record: RecordId) {
        let mut ledger = self.inner.write().await;
        ledger.insert(job.as_str().to_string(), record);
    }
}

/// Tamper-evident audit write engine.
pub struct AuditEngine {
    storage: Arc<dyn AuditStorage>,
    keyring: Arc<SignerKeyring>,
    queue: Arc<dyn JobQueue>,
    config: AuditConfig,
    sequences: SequenceManager,
    pub(crate) locks: TenantLocks,
    jobs: JobLedger,
}

impl AuditEngine {
    /// Create an engine over a store, signer keyring, and job queue.
    pub fn new(
        storage: Arc<dyn AuditStorage>,
        keyring: Arc<SignerKeyring>,
        queue: Arc<dyn JobQueue>,
        config: AuditConfig,
    ) -> Self {
        Self {
            storage,
            keyring,
            queue,
            config,
            sequences: SequenceManager::new(),
            locks: TenantLocks::new(),
            jobs: JobLedger::new(),
        }
    }

    /// The store this engine writes to.
    pub fn storage(&self) -> Arc<dyn AuditStorage> {
        self.storage.clone()
    }

    /// Synchronous write: blocks until the record is durable or fails.
    ///
    /// Fails fast with a `Timeout`-kind error when the tenant lock cannot
    /// be acquired within the configured budget; once the lock is held the
    /// critical section runs to completion or raises. Severity defaults to
    /// [`AuditLevel::Medium`].
    pub async fn log_sync(&self, mut draft: RecordDraft) -> Result<RecordId> {
        draft.level.get_or_insert(AuditLevel::Medium);
        self.write_record(draft, None).await
    }

    /// Asynchronous write: enqueue-only, the worker commits later.
    ///
    /// Severity defaults to [`AuditLevel::Low`]. The returned job id is
    /// the idempotency key the worker dedupes redeliveries on.
    pub async fn log_async(&self, mut draft: RecordDraft) -> Result<JobId> {
        draft.level.get_or_insert(AuditLevel::Low);
        let job = AuditJob::new(draft);
        let id = job.id.clone();
        self.queue.enqueue(job).await?;
        debug!(job_id = %id, "audit job enqueued");
        Ok(id)
    }

    /// Sequence number of the committed chain tail.
    pub async fn get_last_sequence_number(&self, tenant: &TenantId) -> Result<Option<u64>> {
        Ok(self
            .storage
            .get_last_record(tenant)
            .await?
            .map(|r| r.sequence_number))
    }

    /// Hash of the committed chain tail.
    pub async fn get_last_record_hash(&self, tenant: &TenantId) -> Result<Option<Hash256>> {
        Ok(self
            .storage
            .get_last_record(tenant)
            .await?
            .map(|r| r.record_hash))
    }

    /// Replay-safe entry point for the worker: same critical section as
    /// the sync path, keyed by the job's id.
    pub(crate) async fn apply_job(&self, job: &AuditJob) -> Result<RecordId> {
        self.write_record(job.draft.clone(), Some(&job.id)).await
    }

    async fn write_record(&self, draft: RecordDraft, job_id: Option<&JobId>) -> Result<RecordId> {
        let tenant = draft.tenant_id.clone();
        let lock = self.locks.handle(&tenant).await;
        // The timeout bounds lock acquisition only. Cancelling the section
        // after sequence allocation would leave the counter ahead of the
        // chain tail, so once the lock is held the write runs uninterrupted.
        let _guard = match tokio::time::timeout(self.config.sync_timeout(), lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!(tenant = %tenant, "tenant write lock acquisition timed out");
                return Err(Error::WriteTimeout(tenant.to_string()));
            }
        };

        // Dedupe before allocating: a redelivered job whose first attempt
        // committed must not consume a second sequence number.
        if let Some(job) = job_id {
            if let Some(existing) = self.jobs.get(job).await {
                debug!(job_id = %job, record_id = %existing, "job already committed, replay ignored");
                return Ok(existing);
            }
        }

        let previous = self.storage.get_last_record(&tenant).await?;
        let sequence = self.sequences.next(&tenant).await;

        let result = self
            .persist(draft, previous.as_ref(), sequence, job_id)
            .await;
        if result.is_err() {
            // All-or-nothing: a failed persist must not leave the counter
            // ahead of the chain tail.
            if let Err(abort_err) = self.sequences.abort(&tenant, sequence).await {
                error!(tenant = %tenant, sequence, error = %abort_err, "sequence rollback failed");
            }
        }
        result
    }

    async fn persist(
        &self,
        draft: RecordDraft,
        previous: Option<&AuditRecord>,
        sequence: u64,
        job_id: Option<&JobId>,
    ) -> Result<RecordId> {
        let tenant = draft.tenant_id.clone();
        if let Some(prev) = previous {
            if sequence != prev.sequence_number + 1 {
                return Err(Error::SequenceConflict {
                    tenant: tenant.to_string(),
                    allocated: sequence,
                    tail: prev.sequence_number,
                });
            }
        }

        let created_at = now();
        let retention_days = self.effective_retention(&draft);
        let expires_at = created_at + chrono::Duration::days(i64::from(retention_days));
        let level = draft.level.unwrap_or(AuditLevel::Medium);
        let signed_by = draft.signed_by;

        let mut record = AuditRecord {
            id: RecordId::generate(),
            tenant_id: tenant.clone(),
            sequence_number: sequence,
            record_type: draft.record_type,
            description: draft.description,
            subject_type: draft.subject_type,
            subject_id: draft.subject_id,
            causer_type: draft.causer_type,
            causer_id: draft.causer_id,
            properties: draft.properties,
            level,
            algorithm: HashAlgorithm::Sha256,
            previous_hash: previous.map(|r| r.record_hash.clone()),
            record_hash: Hash256::default(),
            signature: None,
            signed_by: None,
            created_at,
            expires_at,
        };
        record.record_hash = compute_record_hash(
            &HashInput::from_record(&record),
            record.previous_hash.as_ref(),
        );

        if let Some(signer) = signed_by {
            let signature = self
                .keyring
                .sign(&signer, record.record_hash.as_bytes())
                .await?;
            record.signature = Some(signature);
            record.signed_by = Some(signer);
        }

        let id = record.id.clone();
        self.storage.store(record).await?;

        if let Some(job) = job_id {
            self.jobs.insert(job, id.clone()).await;
        }
        debug!(tenant = %tenant, sequence, record_id = %id, "audit record committed");
        Ok(id)
    }

    fn effective_retention(&self, draft: &RecordDraft) -> u32 {
        let requested = draft
            .retention_days
            .unwrap_or(self.config.default_retention_days);
        if requested < self.config.min_retention_days {
            warn!(
                tenant = %draft.tenant_id,
                requested,
                floor = self.config.min_retention_days,
                "retention below floor, clamped"
            );
            self.config.min_retention_days
        } else {
            requested
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::queue::MemoryQueue;
    use crate::chain::AuditVerifier;
    use crate::storage::testing::FlakyStorage;
    use crate::storage::{MemoryStorage, RecordQuery};

    fn build_engine(config: AuditConfig) -> (Arc<AuditEngine>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let (queue, _rx) = MemoryQueue::new(config.queue_capacity);
        let engine = Arc::new(AuditEngine::new(
            storage.clone(),
            Arc::new(SignerKeyring::new()),
            Arc::new(queue),
            config,
        ));
        (engine, storage)
    }

    #[tokio::test]
    async fn test_first_records_chain_up() {
        let (engine, storage) = build_engine(AuditConfig::default());

        let id1 = engine
            .log_sync(RecordDraft::new("t1", "user_role_assigned", "Granted admin to u42"))
            .await
            .unwrap();
        let id2 = engine
            .log_sync(RecordDraft::new("t1", "user_role_revoked", "Revoked admin from u42"))
            .await
            .unwrap();

        let r1 = storage.find_by_id(&id1).await.unwrap().unwrap();
        let r2 = storage.find_by_id(&id2).await.unwrap().unwrap();

        assert_eq!(r1.sequence_number, 1);
        assert!(r1.previous_hash.is_none());
        assert_eq!(r2.sequence_number, 2);
        assert_eq!(r2.previous_hash.as_ref(), Some(&r1.record_hash));
        assert_eq!(r1.level, AuditLevel::Medium);
    }

    #[tokio::test]
    async fn test_tenants_get_independent_chains() {
        let (engine, storage) = build_engine(AuditConfig::default());
        engine
            .log_sync(RecordDraft::new("t1", "a", "a"))
            .await
            .unwrap();
        let id = engine
            .log_sync(RecordDraft::new("t2", "b", "b"))
            .await
            .unwrap();

        let record = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.sequence_number, 1);
        assert!(record.previous_hash.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_sync_writes_stay_contiguous() {
        let (engine, storage) = build_engine(AuditConfig::default());

        let mut handles = Vec::new();
        for i in 0..100 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .log_sync(RecordDraft::new("t1", "stress", &format!("write {}", i)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let chain = storage
            .find_by_tenant_sequence(&TenantId::new("t1"))
            .await
            .unwrap();
        let sequences: Vec<u64> = chain.iter().map(|r| r.sequence_number).collect();
        let expected: Vec<u64> = (1..=100).collect();
        assert_eq!(sequences, expected);

        let verifier = AuditVerifier::new(storage, Arc::new(SignerKeyring::new()));
        assert!(verifier
            .verify_chain_integrity(&TenantId::new("t1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_tail_helpers() {
        let (engine, storage) = build_engine(AuditConfig::default());
        let tenant = TenantId::new("t1");
        assert!(engine.get_last_sequence_number(&tenant).await.unwrap().is_none());
        assert!(engine.get_last_record_hash(&tenant).await.unwrap().is_none());

        let id = engine
            .log_sync(RecordDraft::new("t1", "login", "User login"))
            .await
            .unwrap();
        let record = storage.find_by_id(&id).await.unwrap().unwrap();

        assert_eq!(engine.get_last_sequence_number(&tenant).await.unwrap(), Some(1));
        assert_eq!(
            engine.get_last_record_hash(&tenant).await.unwrap(),
            Some(record.record_hash)
        );
    }

    #[tokio::test]
    async fn test_signed_write_verifies() {
        let storage = Arc::new(MemoryStorage::new());
        let keyring = Arc::new(SignerKeyring::new());
        keyring.generate("compliance-officer").await;
        let (queue, _rx) = MemoryQueue::new(8);
        let engine = AuditEngine::new(
            storage.clone(),
            keyring.clone(),
            Arc::new(queue),
            AuditConfig::default(),
        );

        let id = engine
            .log_sync(
                RecordDraft::new("t1", "export", "Quarterly export")
                    .with_level(AuditLevel::Critical)
                    .with_signer("compliance-officer"),
            )
            .await
            .unwrap();

        let record = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.signed_by.as_deref(), Some("compliance-officer"));

        let verifier = AuditVerifier::new(storage.clone(), keyring);
        assert!(verifier.verify_signature(&record).await.unwrap());

        let signed = storage
            .query(&RecordQuery::new().signed_only())
            .await
            .unwrap();
        assert_eq!(signed.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_signer_fails_write() {
        let (engine, storage) = build_engine(AuditConfig::default());
        let err = engine
            .log_sync(RecordDraft::new("t1", "export", "export").with_signer("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSigner(_)));
        assert!(storage.is_empty().await);

        // The aborted allocation is reused by the next write.
        let id = engine
            .log_sync(RecordDraft::new("t1", "export", "export"))
            .await
            .unwrap();
        let record = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.sequence_number, 1);
    }

    #[tokio::test]
    async fn test_retention_clamped_to_floor() {
        let config = AuditConfig::default().with_retention_days(2555, 365);
        let (engine, storage) = build_engine(config);

        let id = engine
            .log_sync(RecordDraft::new("t1", "login", "login").with_retention_days(30))
            .await
            .unwrap();
        let record = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(
            record.expires_at - record.created_at,
            chrono::Duration::days(365)
        );
    }

    #[tokio::test]
    async fn test_retention_above_floor_honored() {
        let config = AuditConfig::default().with_retention_days(2555, 365);
        let (engine, storage) = build_engine(config);

        let id = engine
            .log_sync(RecordDraft::new("t1", "login", "login").with_retention_days(3650))
            .await
            .unwrap();
        let record = storage.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(
            record.expires_at - record.created_at,
            chrono::Duration::days(3650)
        );
    }

    #[tokio::test]
    async fn test_sync_write_times_out_under_stuck_writer() {
        let (engine, _storage) = build_engine(AuditConfig::default().with_sync_timeout_ms(50));

        let tenant = TenantId::new("t1");
        let lock = engine.locks.handle(&tenant).await;
        let _stuck = lock.lock().await;

        let err = engine
            .log_sync(RecordDraft::new("t1", "login", "login"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WriteTimeout(_)));
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back_sequence() {
        let memory = Arc::new(MemoryStorage::new());
        let flaky = Arc::new(FlakyStorage::new(memory.clone(), 1));
        let (queue, _rx) = MemoryQueue::new(8);
        let engine = AuditEngine::new(
            flaky,
            Arc::new(SignerKeyring::new()),
            Arc::new(queue),
            AuditConfig::default(),
        );

        let err = engine
            .log_sync(RecordDraft::new("t1", "login", "first attempt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StorageFailure(_)));
        assert!(memory.is_empty().await);

        // The counter did not advance: the next write still gets sequence 1.
        let id = engine
            .log_sync(RecordDraft::new("t1", "login", "second attempt"))
            .await
            .unwrap();
        let record = memory.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(record.sequence_number, 1);
        assert!(record.previous_hash.is_none());
    }
}
