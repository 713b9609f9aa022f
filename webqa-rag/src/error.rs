//! Error types for the `webqa-rag` crate.
//!
//! Only configuration, missing-index and storage failures cross the crate
//! boundary through [`RagError`]. Generation failures are modelled separately
//! by [`GenerationError`](crate::generation::GenerationError) and are absorbed
//! into degraded answers by the resilience layer.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid configuration or an incompletely assembled pipeline.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The embedder is unreachable or misconfigured (e.g. a missing credential).
    ///
    /// Fatal: never retried automatically.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A question was asked before any index was built.
    #[error("No index available: ingest content before asking questions")]
    NotIndexed,

    /// Persisting, loading or clearing the index failed.
    #[error("Storage error ({backend}): {message}")]
    Storage {
        /// The storage backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The persisted index was written with an unsupported format version.
    #[error("Incompatible index format: found version {found}, expected {expected}")]
    IncompatibleIndex {
        /// Version tag found on disk.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// The query embedder differs from the one the index was built with.
    #[error("Embedder mismatch: index built with '{indexed}', queried with '{query}'")]
    EmbedderMismatch {
        /// Identity recorded in the index manifest.
        indexed: String,
        /// Identity of the embedder used for the query.
        query: String,
    },

    /// The documents could not be turned into chunks.
    #[error("Chunking error: {0}")]
    Chunking(String),
}

impl RagError {
    pub(crate) fn storage(backend: &str, message: impl Into<String>) -> Self {
        Self::Storage { backend: backend.to_string(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
