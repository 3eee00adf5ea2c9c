//! Audit write orchestration.
//!
//! The engine, its per-tenant lock registry, the async job queue and
//! worker, and engine configuration.

pub mod config;
pub mod engine;
pub mod locks;
pub mod queue;
pub mod worker;

pub use config::{AuditConfig, RetryPolicy};
pub use engine::AuditEngine;
pub use queue::{AuditJob, DeadLetter, DeadLetterQueue, JobId, JobQueue, MemoryQueue};
pub use worker::AuditWorker;
