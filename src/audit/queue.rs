//! Async write path plumbing.
//!
//! Job payloads, the at-least-once queue contract, a bounded in-memory
//! queue, and the dead-letter sink for jobs that exhaust their retries.

use crate::core::{now, Error, Result, Timestamp};
use crate::record::RecordDraft;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Unique job identifier, the idempotency key for retries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Create a job ID from a string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deferred audit write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditJob {
    /// Idempotency key; a redelivered job keeps its original id.
    pub id: JobId,
    /// The write to perform.
    pub draft: RecordDraft,
}

impl AuditJob {
    /// Wrap a draft in a new job.
    pub fn new(draft: RecordDraft) -> Self {
        Self {
            id: JobId::generate(),
            draft,
        }
    }
}

/// At-least-once job channel consumed by the audit worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job without blocking the caller.
    async fn enqueue(&self, job: AuditJob) -> Result<()>;
}

/// Bounded in-memory queue over a tokio channel.
pub struct MemoryQueue {
    tx: mpsc::Sender<AuditJob>,
}

impl MemoryQueue {
    /// Create a queue and the receiver its worker consumes.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: AuditJob) -> Result<()> {
        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }
}

/// A job that exhausted its retries.
#[derive(Clone, Debug)]
pub struct DeadLetter {
    /// The failed job, payload intact for manual replay.
    pub job: AuditJob,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Final error text.
    pub last_error: String,
    /// When the job was dead-lettered.
    pub failed_at: Timestamp,
}

/// Terminal sink for failed jobs, held for operator review.
pub struct DeadLetterQueue {
    inner: Mutex<Vec<DeadLetter>>,
}

impl DeadLetterQueue {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Record a failed job.
    pub async fn push(&self, job: AuditJob, attempts: u32, last_error: &Error) {
        let mut letters = self.inner.lock().await;
        letters.push(DeadLetter {
            job,
            attempts,
            last_error: last_error.to_string(),
            failed_at: now(),
        });
    }

    /// Take all dead letters, leaving the sink empty.
    pub async fn drain(&self) -> Vec<DeadLetter> {
        let mut letters = self.inner.lock().await;
        std::mem::take(&mut *letters)
    }

    /// Number of dead letters held.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the sink is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new()
    }
}
