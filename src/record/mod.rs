//! Audit record model.
//!
//! The immutable chain-link value type, severity levels, caller-side
//! drafts, and the canonical encoding fed to the hasher.

pub mod canonical;
pub mod model;

pub use model::{AuditLevel, AuditRecord, HashAlgorithm, RecordDraft, RecordId, TenantId};
