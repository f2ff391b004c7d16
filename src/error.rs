//! Engine error type.
//!
//! [`EngineError`] covers everything the core can surface to a caller.
//! Precondition failures on block and conversation operations are not
//! errors — they are structured result variants defined next to the
//! operations that produce them.

use thiserror::Error;

/// Errors surfaced by the memory engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The database was created with a different embedding model.
    #[error(
        "embedding model mismatch: database is pinned to '{stored}' but '{configured}' is configured. \
         Re-embed into a fresh database or restore the original model."
    )]
    ModelMismatch { stored: String, configured: String },

    /// Two vectors of different dimensionality were compared.
    #[error("vector length mismatch: {left} vs {right}")]
    VectorLenMismatch { left: usize, right: usize },

    /// A zero-length vector reached the codec or similarity math.
    #[error("zero-length vector")]
    ZeroLengthVector,

    /// A table name failed the safe-identifier check.
    #[error("unsafe SQL identifier: {0:?}")]
    UnsafeIdentifier(String),

    /// Input text exceeded the configured limit.
    #[error("input too long: {len} characters (max {max})")]
    InputTooLong { len: usize, max: usize },

    /// Caller-supplied metadata was not valid JSON.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The requested chunk does not exist.
    #[error("chunk not found: {0}")]
    ChunkNotFound(String),

    /// The operation was cancelled at a suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// The embedding capability failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The LLM capability failed.
    #[error("llm call failed: {0}")]
    Llm(String),

    /// An underlying storage error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    /// Stable machine-readable discriminator for tool `details` payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelMismatch { .. } => "model_mismatch",
            Self::VectorLenMismatch { .. } => "vector_len_mismatch",
            Self::ZeroLengthVector => "zero_length_vector",
            Self::UnsafeIdentifier(_) => "unsafe_identifier",
            Self::InputTooLong { .. } => "input_too_long",
            Self::InvalidMetadata(_) => "invalid_metadata",
            Self::ChunkNotFound(_) => "chunk_not_found",
            Self::Cancelled => "cancelled",
            Self::Embedding(_) => "embedding_error",
            Self::Llm(_) => "llm_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Whether a storage error is a transient busy/locked condition.
    ///
    /// Only the best-effort retrieval boost in recall is allowed to
    /// swallow these; everywhere else they propagate.
    pub fn is_transient_busy(&self) -> bool {
        match self {
            Self::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            EngineError::InputTooLong { len: 11, max: 10 }.code(),
            "input_too_long"
        );
        assert_eq!(EngineError::Cancelled.code(), "cancelled");
    }

    #[test]
    fn busy_classification() {
        let busy = EngineError::Storage(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(busy.is_transient_busy());

        let locked = EngineError::Storage(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        ));
        assert!(locked.is_transient_busy());

        assert!(!EngineError::Cancelled.is_transient_busy());
        assert!(!EngineError::Storage(rusqlite::Error::QueryReturnedNoRows).is_transient_busy());
    }
}
