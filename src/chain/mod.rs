//! Hash chain mechanics.
//!
//! Pure hash computation, per-tenant sequence allocation, and on-demand
//! chain verification.

pub mod hasher;
pub mod sequence;
pub mod verifier;

pub use hasher::{compute_record_hash, HashInput};
pub use sequence::SequenceManager;
pub use verifier::AuditVerifier;
