//! Hash chain calculator.
//!
//! Pure, stateless computation of a record's hash from its own fields and
//! the hash of its predecessor. Field order is fixed; encoding rules live
//! in [`crate::record::canonical`].

use crate::core::{Hash256, Timestamp};
use crate::crypto::digest::sha256_multi;
use crate::record::canonical;
use crate::record::{AuditLevel, AuditRecord, HashAlgorithm, TenantId};
use serde_json::Value;
use std::collections::BTreeMap;

/// The hashed subset of a record's fields.
///
/// Borrowed so external tooling can recompute hashes without owning a
/// full record.
#[derive(Clone, Debug)]
pub struct HashInput<'a> {
    /// Digest algorithm tag, itself part of the hash input.
    pub algorithm: HashAlgorithm,
    /// Tenant the record belongs to.
    pub tenant_id: &'a TenantId,
    /// Position in the tenant's chain.
    pub sequence_number: u64,
    /// Free-form classification.
    pub record_type: &'a str,
    /// Human-readable description.
    pub description: &'a str,
    /// Entity acted upon.
    pub subject_type: Option<&'a str>,
    /// Identifier of the entity acted upon.
    pub subject_id: Option<&'a str>,
    /// Actor type.
    pub causer_type: Option<&'a str>,
    /// Actor identifier.
    pub causer_id: Option<&'a str>,
    /// Structured context.
    pub properties: &'a BTreeMap<String, Value>,
    /// Severity level.
    pub level: AuditLevel,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

impl<'a> HashInput<'a> {
    /// Borrow the hashed fields from a record.
    pub fn from_record(record: &'a AuditRecord) -> Self {
        Self {
            algorithm: record.algorithm,
            tenant_id: &record.tenant_id,
            sequence_number: record.sequence_number,
            record_type: &record.record_type,
            description: &record.description,
            subject_type: record.subject_type.as_deref(),
            subject_id: record.subject_id.as_deref(),
            causer_type: record.causer_type.as_deref(),
            causer_id: record.causer_id.as_deref(),
            properties: &record.properties,
            level: record.level,
            created_at: record.created_at,
        }
    }
}

/// Compute a record's hash from its fields and its predecessor's hash.
pub fn compute_record_hash(input: &HashInput<'_>, previous: Option<&Hash256>) -> Hash256 {
    let previous_hex = previous.map(|h| h.to_hex());
    let chunks: Vec<Vec<u8>> = vec![
        canonical::field("algorithm", input.algorithm.as_str().as_bytes()),
        canonical::field("tenant_id", input.tenant_id.as_str().as_bytes()),
        canonical::field(
            "sequence_number",
            input.sequence_number.to_string().as_bytes(),
        ),
        canonical::field("record_type", input.record_type.as_bytes()),
        canonical::field("description", input.description.as_bytes()),
        canonical::optional_field("subject_type", input.subject_type),
        canonical::optional_field("subject_id", input.subject_id),
        canonical::optional_field("causer_type", input.causer_type),
        canonical::optional_field("causer_id", input.causer_id),
        canonical::field(
            "properties",
            canonical::canonical_properties(input.properties).as_bytes(),
        ),
        canonical::field("level", input.level.as_u8().to_string().as_bytes()),
        canonical::optional_field("previous_hash", previous_hex.as_deref()),
        canonical::field(
            "created_at",
            canonical::canonical_timestamp(&input.created_at).as_bytes(),
        ),
    ];

    let refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
    match input.algorithm {
        HashAlgorithm::Sha256 => sha256_multi(&refs),
    }
}

/// Recompute a record's hash and compare with the stored value.
pub fn record_hash_matches(record: &AuditRecord) -> bool {
    let input = HashInput::from_record(record);
    compute_record_hash(&input, record.previous_hash.as_ref()) == record.record_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::now;
    use serde_json::json;

    fn test_input<'a>(tenant: &'a TenantId, props: &'a BTreeMap<String, Value>) -> HashInput<'a> {
        HashInput {
            algorithm: HashAlgorithm::Sha256,
            tenant_id: tenant,
            sequence_number: 1,
            record_type: "user_role_assigned",
            description: "Granted admin to u42",
            subject_type: Some("user"),
            subject_id: Some("u42"),
            causer_type: None,
            causer_id: None,
            properties: props,
            level: AuditLevel::Medium,
            created_at: chrono::DateTime::parse_from_rfc3339("2026-03-01T09:30:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        }
    }

    #[test]
    fn test_hash_deterministic() {
        let tenant = TenantId::new("t1");
        let props = BTreeMap::new();
        let input = test_input(&tenant, &props);
        assert_eq!(
            compute_record_hash(&input, None),
            compute_record_hash(&input, None)
        );
    }

    #[test]
    fn test_hash_changes_with_description() {
        let tenant = TenantId::new("t1");
        let props = BTreeMap::new();
        let input = test_input(&tenant, &props);
        let mut edited = input.clone();
        edited.description = "Granted admin to u43";
        assert_ne!(
            compute_record_hash(&input, None),
            compute_record_hash(&edited, None)
        );
    }

    #[test]
    fn test_hash_changes_with_previous() {
        let tenant = TenantId::new("t1");
        let props = BTreeMap::new();
        let input = test_input(&tenant, &props);
        let prev = Hash256::new([9u8; 32]);
        assert_ne!(
            compute_record_hash(&input, None),
            compute_record_hash(&input, Some(&prev))
        );
    }

    #[test]
    fn test_hash_distinguishes_absent_from_empty() {
        let tenant = TenantId::new("t1");
        let props = BTreeMap::new();
        let absent = test_input(&tenant, &props);
        let mut empty = absent.clone();
        empty.causer_type = Some("");
        assert_ne!(
            compute_record_hash(&absent, None),
            compute_record_hash(&empty, None)
        );
    }

    #[test]
    fn test_hash_covers_properties() {
        let tenant = TenantId::new("t1");
        let empty = BTreeMap::new();
        let mut props = BTreeMap::new();
        props.insert("role".to_string(), json!("admin"));

        let a = test_input(&tenant, &empty);
        let b = test_input(&tenant, &props);
        assert_ne!(compute_record_hash(&a, None), compute_record_hash(&b, None));
    }

    #[test]
    fn test_hash_changes_with_timestamp() {
        let tenant = TenantId::new("t1");
        let props = BTreeMap::new();
        let input = test_input(&tenant, &props);
        let mut later = input.clone();
        later.created_at = now();
        assert_ne!(
            compute_record_hash(&input, None),
            compute_record_hash(&later, None)
        );
    }
}
