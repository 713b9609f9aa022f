//! # webqa-rag
//!
//! Answer questions from the content of a fixed set of web pages.
//!
//! Pages are split into overlapping chunks, embedded, and stored as a single
//! persisted vector index. Questions are answered by retrieving the nearest
//! chunks, rendering a grounded prompt, and calling a throttled generator whose
//! failures come back as degraded answers instead of errors.
//!
//! ## Components
//!
//! - [`RecursiveChunker`]: boundary-aware splitting with overlap
//! - [`VectorIndex`]: exact Euclidean nearest-neighbour search
//! - [`IndexStore`]: single-slot persistence ([`FileIndexStore`], [`InMemoryIndexStore`])
//! - [`ResilientGenerator`]: throttling and failure classification
//! - [`RagPipeline`]: `ingest` / `ask` / `reset_index`
//!
//! ## Features
//!
//! - `gemini`: Gemini embedding and generation adapters

pub mod attribution;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod generation;
pub mod index;
pub mod pipeline;
pub mod prompt;
pub mod resilience;
pub mod store;
pub mod throttle;

pub use chunking::{Chunker, RecursiveChunker, split_documents};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{AnswerRecord, Chunk, Document, SearchResult, Snippet, SourceAttribution};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiEmbeddingProvider, GeminiGenerator};
pub use generation::{GenerationError, GenerationErrorKind, Generator};
pub use index::{INDEX_FORMAT_VERSION, IndexManifest, IndexedChunk, VectorIndex};
pub use pipeline::{IngestReport, RagPipeline, RagPipelineBuilder};
pub use resilience::{GenerationOutcome, ResilientGenerator};
pub use store::{FileIndexStore, InMemoryIndexStore, IndexRevision, IndexStore};
pub use throttle::MinIntervalThrottle;
