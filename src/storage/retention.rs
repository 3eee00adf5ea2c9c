//! Retention purge sweep.
//!
//! The single path that removes records, and only records whose
//! `expires_at` has passed.

use crate::core::{Result, Timestamp};
use crate::record::RecordId;
use crate::storage::backend::AuditStorage;
use std::sync::Arc;
use tracing::info;

/// Outcome of one purge sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurgeReport {
    /// Records found past their retention window.
    pub expired: u64,
    /// Records actually deleted.
    pub deleted: u64,
}

/// Periodic retention purge over a store.
pub struct RetentionSweeper {
    storage: Arc<dyn AuditStorage>,
}

impl RetentionSweeper {
    /// Create a sweeper over a store.
    pub fn new(storage: Arc<dyn AuditStorage>) -> Self {
        Self { storage }
    }

    /// Delete every record whose retention window has passed as of `now`.
    pub async fn sweep(&self, now: Timestamp) -> Result<PurgeReport> {
        let expired = self.storage.find_expired(now).await?;
        if expired.is_empty() {
            return Ok(PurgeReport {
                expired: 0,
                deleted: 0,
            });
        }

        let ids: Vec<RecordId> = expired.iter().map(|r| r.id.clone()).collect();
        let deleted = self.storage.delete_expired(&ids, now).await?;
        info!(expired = ids.len(), deleted, "retention sweep completed");

        Ok(PurgeReport {
            expired: ids.len() as u64,
            deleted,
        })
    }
}
