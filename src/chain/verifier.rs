//! Chain integrity verification.
//!
//! Walks a tenant's chain, recomputes every hash, and checks linkage and
//! sequence contiguity. Verification is fail-closed: a broken chain is
//! reported, never repaired.

use crate::chain::hasher::{compute_record_hash, HashInput};
use crate::core::{Error, Hash256, Result};
use crate::crypto::SignerKeyring;
use crate::record::{AuditRecord, TenantId};
use crate::storage::AuditStorage;
use std::sync::Arc;
use tracing::warn;

/// On-demand verifier over a store.
pub struct AuditVerifier {
    storage: Arc<dyn AuditStorage>,
    keyring: Arc<SignerKeyring>,
}

impl AuditVerifier {
    /// Create a verifier over a store and the keyring holding signer
    /// public keys.
    pub fn new(storage: Arc<dyn AuditStorage>, keyring: Arc<SignerKeyring>) -> Self {
        Self { storage, keyring }
    }

    /// Verify a tenant's full chain.
    ///
    /// Recomputes each record's hash, checks `previous_hash` linkage
    /// between consecutive records, and checks for sequence gaps. Returns
    /// `Ok(true)` for a valid (possibly empty) chain. A purged prefix is
    /// tolerated: the lowest remaining sequence is treated as the chain
    /// start, and only a record at sequence 1 must carry an empty
    /// `previous_hash`.
    pub async fn verify_chain_integrity(&self, tenant: &TenantId) -> Result<bool> {
        let records = self.storage.find_by_tenant_sequence(tenant).await?;

        let mut previous: Option<&AuditRecord> = None;
        for record in &records {
            self.check_record_hash(record)?;

            match previous {
                Some(prev) => {
                    if record.sequence_number != prev.sequence_number + 1 {
                        let missing: Vec<u64> =
                            (prev.sequence_number + 1..record.sequence_number).collect();
                        warn!(
                            tenant = %tenant,
                            ?missing,
                            "sequence gap detected during chain verification"
                        );
                        return Err(Error::SequenceGap {
                            tenant: tenant.to_string(),
                            missing,
                        });
                    }
                    if record.previous_hash.as_ref() != Some(&prev.record_hash) {
                        warn!(
                            tenant = %tenant,
                            sequence = record.sequence_number,
                            "broken chain link detected"
                        );
                        return Err(Error::BrokenLink {
                            tenant: tenant.to_string(),
                            sequence: record.sequence_number,
                        });
                    }
                }
                None => {
                    if record.sequence_number == 1 && record.previous_hash.is_some() {
                        warn!(tenant = %tenant, "first record carries a previous hash");
                        return Err(Error::BrokenLink {
                            tenant: tenant.to_string(),
                            sequence: 1,
                        });
                    }
                }
            }

            previous = Some(record);
        }

        Ok(true)
    }

    /// Single-record recomputation check.
    pub fn verify_record(&self, record: &AuditRecord) -> Result<bool> {
        self.check_record_hash(record)?;
        Ok(true)
    }

    /// Verify a record's Ed25519 signature against its recorded signer.
    pub async fn verify_signature(&self, record: &AuditRecord) -> Result<bool> {
        let (signature, signer) = match (&record.signature, &record.signed_by) {
            (Some(signature), Some(signer)) => (signature, signer),
            _ => return Err(Error::MissingSignature(record.id.to_string())),
        };
        self.keyring
            .verify(signer, record.record_hash.as_bytes(), signature)
            .await?;
        Ok(true)
    }

    /// Missing sequence numbers for a tenant, without throwing.
    ///
    /// Diagnostic companion to [`verify_chain_integrity`]: reports gaps
    /// between the lowest and highest remaining sequence numbers.
    ///
    /// [`verify_chain_integrity`]: AuditVerifier::verify_chain_integrity
    pub async fn detect_sequence_gaps(&self, tenant: &TenantId) -> Result<Vec<u64>> {
        let records = self.storage.find_by_tenant_sequence(tenant).await?;

        let mut missing = Vec::new();
        let mut expected: Option<u64> = None;
        for record in &records {
            if let Some(expected) = expected {
                missing.extend(expected..record.sequence_number);
            }
            expected = Some(record.sequence_number + 1);
        }
        Ok(missing)
    }

    /// Recompute a hash from raw fields, for external audit tooling.
    pub fn calculate_record_hash(
        &self,
        input: &HashInput<'_>,
        previous: Option<&Hash256>,
    ) -> Hash256 {
        compute_record_hash(input, previous)
    }

    fn check_record_hash(&self, record: &AuditRecord) -> Result<()> {
        let recomputed = compute_record_hash(
            &HashInput::from_record(record),
            record.previous_hash.as_ref(),
        );
        if recomputed != record.record_hash {
            warn!(record_id = %record.id, "record hash mismatch");
            return Err(Error::Tampered {
                record_id: record.id.to_string(),
                reason: "stored hash does not match recomputation".to_string(),
            });
        }
        Ok(())
    }
}
