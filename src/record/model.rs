//! Audit record structure.
//!
//! Immutable representation of one chain link. Records are created only
//! by the engine; after persistence the sole lifecycle event is deletion
//! of retention-expired records.

use crate::core::{Hash256, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique record identifier (UUIDv7, time-sortable).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a record ID from a string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique, time-sortable ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant isolation key. All chain invariants are scoped per tenant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    /// Create a tenant ID from a string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record severity, ordinal 1-4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum AuditLevel {
    /// Routine, high-volume events.
    Low = 1,
    /// Default for compliance-relevant events.
    Medium = 2,
    /// Sensitive operations.
    High = 3,
    /// Events requiring immediate review.
    Critical = 4,
}

impl AuditLevel {
    /// Ordinal value (1-4).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse from ordinal value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AuditLevel::Low),
            2 => Some(AuditLevel::Medium),
            3 => Some(AuditLevel::High),
            4 => Some(AuditLevel::Critical),
            _ => None,
        }
    }
}

impl From<AuditLevel> for u8 {
    fn from(level: AuditLevel) -> u8 {
        level.as_u8()
    }
}

impl TryFrom<u8> for AuditLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AuditLevel::from_u8(value).ok_or_else(|| format!("invalid audit level: {}", value))
    }
}

impl std::fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditLevel::Low => write!(f, "low"),
            AuditLevel::Medium => write!(f, "medium"),
            AuditLevel::High => write!(f, "high"),
            AuditLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Digest algorithm recorded on every record.
///
/// The tag is part of the hash input, so chains can mix algorithms when
/// the baseline is ever upgraded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    /// SHA-256 baseline.
    Sha256,
}

impl HashAlgorithm {
    /// Canonical text form used in the hash input.
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit record, one link in a tenant's hash chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique, time-sortable record ID.
    pub id: RecordId,
    /// Tenant the record belongs to.
    pub tenant_id: TenantId,
    /// Position in the tenant's chain, starting at 1, no gaps.
    pub sequence_number: u64,
    /// Free-form classification.
    pub record_type: String,
    /// Human-readable description.
    pub description: String,
    /// Entity acted upon (optional).
    pub subject_type: Option<String>,
    /// Identifier of the entity acted upon (optional).
    pub subject_id: Option<String>,
    /// Actor type (optional).
    pub causer_type: Option<String>,
    /// Actor identifier (optional).
    pub causer_id: Option<String>,
    /// Structured context, raw and unmasked. Redaction is the caller's job.
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Severity level.
    pub level: AuditLevel,
    /// Digest algorithm used for `record_hash`.
    pub algorithm: HashAlgorithm,
    /// Hash of the preceding record, `None` for the first in the chain.
    pub previous_hash: Option<Hash256>,
    /// Hash over the canonical encoding of this record's fields.
    pub record_hash: Hash256,
    /// Ed25519 signature over `record_hash` (optional).
    pub signature: Option<Vec<u8>>,
    /// Identity that produced `signature` (optional).
    pub signed_by: Option<String>,
    /// Creation timestamp, write-once.
    pub created_at: Timestamp,
    /// Earliest instant the record may be purged.
    pub expires_at: Timestamp,
}

impl AuditRecord {
    /// Whether the retention window has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> crate::core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Caller-side parameters for a new record.
///
/// The engine fills in sequence number, hashes, signature, and timestamps
/// when the draft enters the chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Tenant to append to.
    pub tenant_id: TenantId,
    /// Free-form classification.
    pub record_type: String,
    /// Human-readable description.
    pub description: String,
    /// Entity acted upon.
    pub subject_type: Option<String>,
    /// Identifier of the entity acted upon.
    pub subject_id: Option<String>,
    /// Actor type.
    pub causer_type: Option<String>,
    /// Actor identifier.
    pub causer_id: Option<String>,
    /// Structured context.
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Severity; the write path picks its default when unset.
    pub level: Option<AuditLevel>,
    /// Retention override in days; clamped to the configured floor.
    pub retention_days: Option<u32>,
    /// Identity to sign the record as.
    pub signed_by: Option<String>,
}

impl RecordDraft {
    /// Create a new draft.
    pub fn new(tenant_id: &str, record_type: &str, description: &str) -> Self {
        Self {
            tenant_id: TenantId::new(tenant_id),
            record_type: record_type.to_string(),
            description: description.to_string(),
            subject_type: None,
            subject_id: None,
            causer_type: None,
            causer_id: None,
            properties: BTreeMap::new(),
            level: None,
            retention_days: None,
            signed_by: None,
        }
    }

    /// Set the entity acted upon.
    pub fn with_subject(mut self, subject_type: &str, subject_id: &str) -> Self {
        self.subject_type = Some(subject_type.to_string());
        self.subject_id = Some(subject_id.to_string());
        self
    }

    /// Set the actor.
    pub fn with_causer(mut self, causer_type: &str, causer_id: &str) -> Self {
        self.causer_type = Some(causer_type.to_string());
        self.causer_id = Some(causer_id.to_string());
        self
    }

    /// Add a structured property.
    pub fn with_property(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.properties.insert(key.to_string(), v);
        }
        self
    }

    /// Set severity.
    pub fn with_level(mut self, level: AuditLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Override retention in days.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    /// Request an Ed25519 signature from the named identity.
    pub fn with_signer(mut self, signer: &str) -> Self {
        self.signed_by = Some(signer.to_string());
        self
    }
}
