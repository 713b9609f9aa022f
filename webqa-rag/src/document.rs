//! Data types for documents, chunks, search results and answers.

use serde::{Deserialize, Serialize};

use crate::generation::GenerationErrorKind;

/// A fetched page: raw text plus the URL it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Origin identifier, usually the source URL.
    pub origin: String,
    /// The text content of the page.
    pub text: String,
}

impl Document {
    /// Create a document from an origin identifier and its already-fetched text.
    pub fn new(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self { origin: origin.into(), text: text.into() }
    }
}

/// A contiguous, bounded segment of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Unique identifier, `{origin}#{index}`.
    pub id: String,
    /// Origin identifier inherited verbatim from the parent document.
    pub origin: String,
    /// The text content of the chunk.
    pub text: String,
    /// Position of this chunk within its document.
    pub index: usize,
    /// Byte offset of the chunk's first character in the parent document.
    pub start: usize,
}

/// A retrieved [`Chunk`] paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Euclidean distance to the query vector (lower is more relevant).
    pub distance: f32,
}

/// A preview of one chunk that contributed to an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snippet {
    /// Chunk text, truncated to the configured preview length.
    pub text: String,
    /// Distance of the originating chunk.
    pub distance: f32,
}

/// One source that contributed to an answer, with its best snippets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceAttribution {
    /// Origin identifier of the source.
    pub origin: String,
    /// Contributing snippets, most relevant first.
    pub snippets: Vec<Snippet>,
}

/// The result of answering a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    /// Generated answer, or a human-readable explanation when degraded.
    pub answer: String,
    /// Deduplicated sources ordered by their best rank.
    pub sources: Vec<SourceAttribution>,
    /// Set when generation failed and `answer` holds a fallback message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<GenerationErrorKind>,
}

impl AnswerRecord {
    /// Build a degraded record carrying a fallback message and no sources.
    pub fn degraded(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        Self { answer: message.into(), sources: Vec::new(), degraded: Some(kind) }
    }

    /// Whether this record holds a fallback message instead of a generated answer.
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Origin identifiers of all sources in rank order.
    pub fn source_origins(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.origin.as_str()).collect()
    }
}
