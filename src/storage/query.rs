//! Query filters for audit records.
//!
//! The read surface used by compliance reporting.

use crate::core::Timestamp;
use crate::record::{AuditLevel, AuditRecord, TenantId};
use serde::{Deserialize, Serialize};

/// Filter for querying audit records.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    /// Filter by tenant.
    pub tenant_id: Option<TenantId>,
    /// Filter by record type.
    pub record_type: Option<String>,
    /// Filter by severity (minimum).
    pub min_level: Option<AuditLevel>,
    /// Filter by creation date from.
    pub date_from: Option<Timestamp>,
    /// Filter by creation date to.
    pub date_to: Option<Timestamp>,
    /// Signed records only.
    pub signed_only: bool,
    /// Maximum results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl RecordQuery {
    /// Create a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by tenant.
    pub fn by_tenant(mut self, tenant: &str) -> Self {
        self.tenant_id = Some(TenantId::new(tenant));
        self
    }

    /// Filter by record type.
    pub fn by_type(mut self, record_type: &str) -> Self {
        self.record_type = Some(record_type.to_string());
        self
    }

    /// Filter by minimum severity.
    pub fn by_min_level(mut self, level: AuditLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Filter by creation date range.
    pub fn by_date_range(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Signed records only.
    pub fn signed_only(mut self) -> Self {
        self.signed_only = true;
        self
    }

    /// Set result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(tenant) = &self.tenant_id {
            if &record.tenant_id != tenant {
                return false;
            }
        }

        if let Some(record_type) = &self.record_type {
            if &record.record_type != record_type {
                return false;
            }
        }

        if let Some(min_level) = self.min_level {
            if record.level < min_level {
                return false;
            }
        }

        if let Some(from) = self.date_from {
            if record.created_at < from {
                return false;
            }
        }

        if let Some(to) = self.date_to {
            if record.created_at > to {
                return false;
            }
        }

        if self.signed_only && record.signature.is_none() {
            return false;
        }

        true
    }
}
