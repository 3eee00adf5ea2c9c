//! # TEAL - Tamper-Evident Audit Ledger
//!
//! A compliance-grade audit core providing:
//! - **Hash chain**: append-only records, each embedding its predecessor's
//!   SHA-256 hash, so retroactive edits are detectable
//! - **Per-tenant sequencing**: monotonic, gap-free sequence numbers under
//!   full write concurrency
//! - **Non-repudiation**: optional Ed25519 signatures over record hashes
//! - **Sync and async write paths** sharing one per-tenant critical section
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teal::audit::{AuditConfig, AuditEngine, MemoryQueue};
//! use teal::crypto::SignerKeyring;
//! use teal::record::RecordDraft;
//! use teal::storage::MemoryStorage;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(MemoryStorage::new());
//!     let (queue, _jobs) = MemoryQueue::new(1024);
//!     let engine = AuditEngine::new(
//!         storage,
//!         Arc::new(SignerKeyring::new()),
//!         Arc::new(queue),
//!         AuditConfig::default(),
//!     );
//!
//!     let id = engine
//!         .log_sync(RecordDraft::new("t1", "user_role_assigned", "Granted admin to u42"))
//!         .await
//!         .unwrap();
//!     println!("audit record: {}", id);
//! }
//! ```

pub mod audit;
pub mod chain;
pub mod core;
pub mod crypto;
pub mod record;
pub mod storage;

pub use crate::core::error::{Error, ErrorKind, Result};
