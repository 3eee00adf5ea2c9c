//! Async audit worker.
//!
//! Consumes queued jobs and replays the engine's critical section for
//! each. Failures retry with bounded exponential backoff; exhausted jobs
//! land in the dead-letter sink for operator review, never dropped.

use crate::audit::config::RetryPolicy;
use crate::audit::engine::AuditEngine;
use crate::audit::queue::{AuditJob, DeadLetterQueue};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Single consumer of the audit job queue.
pub struct AuditWorker {
    engine: Arc<AuditEngine>,
    receiver: mpsc::Receiver<AuditJob>,
    retry: RetryPolicy,
    dead_letters: Arc<DeadLetterQueue>,
}

impl AuditWorker {
    /// Create a worker over a queue receiver.
    pub fn new(
        engine: Arc<AuditEngine>,
        receiver: mpsc::Receiver<AuditJob>,
        retry: RetryPolicy,
        dead_letters: Arc<DeadLetterQueue>,
    ) -> Self {
        Self {
            engine,
            receiver,
            retry,
            dead_letters,
        }
    }

    /// Drain the queue until every sender is dropped.
    pub async fn run(mut self) {
        info!("audit worker started");
        while let Some(job) = self.receiver.recv().await {
            self.process(job).await;
        }
        info!("audit worker stopped");
    }

    /// Commit one job, retrying on failure.
    ///
    /// `apply_job` dedupes on the job id, so a retry after a commit whose
    /// acknowledgment was lost returns the original record instead of
    /// allocating a second sequence number.
    async fn process(&self, job: AuditJob) {
        let mut attempt = 1u32;
        loop {
            match self.engine.apply_job(&job).await {
                Ok(record_id) => {
                    debug!(job_id = %job.id, %record_id, attempt, "audit job committed");
                    return;
                }
                Err(err) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        job_id = %job.id,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "audit job failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        job_id = %job.id,
                        attempt,
                        error = %err,
                        "audit job exhausted retries, dead-lettered"
                    );
                    self.dead_letters.push(job, attempt, &err).await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::config::AuditConfig;
    use crate::audit::queue::MemoryQueue;
    use crate::chain::AuditVerifier;
    use crate::crypto::SignerKeyring;
    use crate::record::{AuditLevel, RecordDraft, TenantId};
    use crate::storage::testing::FlakyStorage;
    use crate::storage::{AuditStorage, MemoryStorage};
    use std::time::Duration;

    fn init_logs() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    struct Harness {
        engine: Arc<AuditEngine>,
        memory: Arc<MemoryStorage>,
        dead_letters: Arc<DeadLetterQueue>,
    }

    /// Engine + running worker over a store that fails `failures` times.
    fn start(failures: u32, retry: RetryPolicy) -> Harness {
        init_logs();
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn AuditStorage> =
            Arc::new(FlakyStorage::new(memory.clone(), failures));
        let (queue, receiver) = MemoryQueue::new(64);
        let config = AuditConfig::default().with_retry(retry.clone());
        let engine = Arc::new(AuditEngine::new(
            storage,
            Arc::new(SignerKeyring::new()),
            Arc::new(queue),
            config,
        ));
        let dead_letters = Arc::new(DeadLetterQueue::new());
        let worker = AuditWorker::new(engine.clone(), receiver, retry, dead_letters.clone());
        tokio::spawn(worker.run());
        Harness {
            engine,
            memory,
            dead_letters,
        }
    }

    async fn wait_for<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..500 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_async_write_commits() {
        let h = start(0, fast_retry(5));
        let job_id = h
            .engine
            .log_async(RecordDraft::new("t1", "page_view", "Viewed dashboard"))
            .await
            .unwrap();
        assert!(!job_id.as_str().is_empty());

        let memory = h.memory.clone();
        wait_for(|| {
            let memory = memory.clone();
            async move { memory.len().await == 1 }
        })
        .await;

        let chain = h
            .memory
            .find_by_tenant_sequence(&TenantId::new("t1"))
            .await
            .unwrap();
        assert_eq!(chain[0].sequence_number, 1);
        assert_eq!(chain[0].level, AuditLevel::Low);
    }

    #[tokio::test]
    async fn test_mixed_sync_async_single_chain() {
        let h = start(0, fast_retry(5));

        for i in 0..5 {
            h.engine
                .log_async(RecordDraft::new("t1", "bulk", &format!("async {}", i)))
                .await
                .unwrap();
            h.engine
                .log_sync(RecordDraft::new("t1", "interactive", &format!("sync {}", i)))
                .await
                .unwrap();
        }

        let memory = h.memory.clone();
        wait_for(|| {
            let memory = memory.clone();
            async move { memory.len().await == 10 }
        })
        .await;

        let sequences: Vec<u64> = h
            .memory
            .find_by_tenant_sequence(&TenantId::new("t1"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.sequence_number)
            .collect();
        let expected: Vec<u64> = (1..=10).collect();
        assert_eq!(sequences, expected);

        let verifier =
            AuditVerifier::new(h.memory.clone(), Arc::new(SignerKeyring::new()));
        assert!(verifier
            .verify_chain_integrity(&TenantId::new("t1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_transient_failure_retried_to_success() {
        let h = start(2, fast_retry(5));
        h.engine
            .log_async(RecordDraft::new("t1", "bulk", "survives outage"))
            .await
            .unwrap();

        let memory = h.memory.clone();
        wait_for(|| {
            let memory = memory.clone();
            async move { memory.len().await == 1 }
        })
        .await;
        assert!(h.dead_letters.is_empty().await);
    }

    #[tokio::test]
    async fn test_exhausted_job_dead_lettered_once() {
        let h = start(u32::MAX, fast_retry(3));
        let job_id = h
            .engine
            .log_async(RecordDraft::new("t1", "bulk", "never lands"))
            .await
            .unwrap();

        let dead_letters = h.dead_letters.clone();
        wait_for(|| {
            let dead_letters = dead_letters.clone();
            async move { dead_letters.len().await == 1 }
        })
        .await;

        let letters = h.dead_letters.drain().await;
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].job.id, job_id);
        assert_eq!(letters[0].attempts, 3);
        assert_eq!(letters[0].job.draft.description, "never lands");
        assert!(h.memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_replayed_job_does_not_duplicate() {
        let memory = Arc::new(MemoryStorage::new());
        let (queue, _receiver) = MemoryQueue::new(8);
        let engine = AuditEngine::new(
            memory.clone(),
            Arc::new(SignerKeyring::new()),
            Arc::new(queue),
            AuditConfig::default(),
        );

        let mut draft = RecordDraft::new("t1", "bulk", "delivered twice");
        draft.level = Some(AuditLevel::Low);
        let job = AuditJob::new(draft);

        let first = engine.apply_job(&job).await.unwrap();
        let second = engine.apply_job(&job).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_retry_after_partial_failure_keeps_sequence() {
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn AuditStorage> = Arc::new(FlakyStorage::new(memory.clone(), 1));
        let (queue, _receiver) = MemoryQueue::new(8);
        let engine = AuditEngine::new(
            storage,
            Arc::new(SignerKeyring::new()),
            Arc::new(queue),
            AuditConfig::default(),
        );

        let job = AuditJob::new(RecordDraft::new("t1", "bulk", "partial failure"));

        // First delivery fails mid-persist; redelivery must not skip a
        // sequence number.
        assert!(engine.apply_job(&job).await.is_err());
        engine.apply_job(&job).await.unwrap();

        let chain = memory
            .find_by_tenant_sequence(&TenantId::new("t1"))
            .await
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].sequence_number, 1);
    }
}
