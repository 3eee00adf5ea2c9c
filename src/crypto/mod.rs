//! Cryptographic utilities for TEAL.
//!
//! Provides SHA-256 hashing for the chain and Ed25519 signing for
//! non-repudiation.

pub mod digest;
pub mod signer;

pub use digest::{sha256, sha256_multi};
pub use signer::SignerKeyring;
