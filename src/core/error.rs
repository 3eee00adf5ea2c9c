//! Error types for TEAL.

use thiserror::Error;

/// Result type alias for TEAL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification for callers that route on failure class
/// rather than on the specific variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Sequence allocation or contiguity failure.
    Sequence,
    /// Persistence I/O failure.
    Storage,
    /// Hash or chain-link mismatch detected on verify/read.
    Tampered,
    /// Signature missing, malformed, or failing verification.
    Signature,
    /// Lock or I/O budget exceeded.
    Timeout,
    /// Enqueue failure on the async path.
    Queue,
    /// Everything else.
    Internal,
}

/// Errors that can occur in TEAL operations.
#[derive(Error, Debug)]
pub enum Error {
    // Sequence errors
    #[error("sequence conflict for tenant {tenant}: allocated {allocated}, chain tail is {tail}")]
    SequenceConflict {
        tenant: String,
        allocated: u64,
        tail: u64,
    },

    #[error("sequence gap for tenant {tenant}: missing {missing:?}")]
    SequenceGap { tenant: String, missing: Vec<u64> },

    #[error("sequence rollback rejected for tenant {tenant}: {sequence} is not the latest allocation")]
    SequenceRollback { tenant: String, sequence: u64 },

    // Storage errors
    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("duplicate record for tenant {tenant} at sequence {sequence}")]
    DuplicateSequence { tenant: String, sequence: u64 },

    #[error("record {0} has not expired, deletion refused")]
    RetentionNotElapsed(String),

    // Chain integrity errors
    #[error("record {record_id} tampered: {reason}")]
    Tampered { record_id: String, reason: String },

    #[error("broken chain link for tenant {tenant} at sequence {sequence}")]
    BrokenLink { tenant: String, sequence: u64 },

    // Signature errors
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("record {0} carries no signature")]
    MissingSignature(String),

    #[error("unknown signer: {0}")]
    UnknownSigner(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    // Timeout errors
    #[error("audit write timed out for tenant {0}")]
    WriteTimeout(String),

    // Queue errors
    #[error("audit queue is full")]
    QueueFull,

    #[error("audit queue is closed")]
    QueueClosed,

    // Serialization errors
    #[error("serialization error: {0}")]
    SerializationError(String),

    // Generic errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error into its failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SequenceConflict { .. }
            | Error::SequenceGap { .. }
            | Error::SequenceRollback { .. }
            | Error::DuplicateSequence { .. } => ErrorKind::Sequence,
            Error::StorageFailure(_)
            | Error::RecordNotFound(_)
            | Error::RetentionNotElapsed(_)
            | Error::Io(_) => ErrorKind::Storage,
            Error::Tampered { .. } | Error::BrokenLink { .. } => ErrorKind::Tampered,
            Error::SignatureVerificationFailed
            | Error::MissingSignature(_)
            | Error::UnknownSigner(_)
            | Error::InvalidKeyFormat(_) => ErrorKind::Signature,
            Error::WriteTimeout(_) => ErrorKind::Timeout,
            Error::QueueFull | Error::QueueClosed => ErrorKind::Queue,
            Error::SerializationError(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(_: ed25519_dalek::SignatureError) -> Self {
        Error::SignatureVerificationFailed
    }
}
