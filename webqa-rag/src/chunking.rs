//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! cuts documents into overlapping, size-bounded spans while preferring
//! paragraph, line, sentence and word boundaries over hard cuts.
//!
//! Chunks are contiguous spans of the source text: every chunk after the first
//! begins at or before the end of its predecessor, so a document can always be
//! rebuilt from its chunks and their `start` offsets.

use std::ops::Range;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Break candidates, strongest first. Separators within a tier compete on position.
const SEPARATOR_TIERS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has blank text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split every document, preserving document order.
    fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Each chunk holds at most `chunk_size` characters. Consecutive chunks share up
/// to `chunk_overlap` characters; the shared region always starts on a word
/// boundary, so it may be shorter than `chunk_overlap` or empty.
///
/// # Example
///
/// ```rust,ignore
/// use webqa_rag::{Document, RecursiveChunker, Chunker};
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&Document::new("https://a.test", text));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum number of characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum number of characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        split_spans(&document.text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(index, span)| Chunk {
                id: format!("{}#{index}", document.origin),
                origin: document.origin.clone(),
                text: document.text[span.clone()].to_string(),
                index,
                start: span.start,
            })
            .collect()
    }
}

/// Split `documents` with a [`RecursiveChunker`] of the given parameters.
///
/// # Errors
///
/// Returns [`RagError::Configuration`] unless `chunk_size > chunk_overlap`.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    Ok(RecursiveChunker::new(chunk_size, chunk_overlap)?.chunk_all(documents))
}

/// Compute byte ranges of the chunks of `text`.
fn split_spans(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        let Some((window_len, _)) = rest.char_indices().nth(chunk_size) else {
            spans.push(start..text.len());
            break;
        };

        let window = &rest[..window_len];
        let end = start + break_point(window, chunk_overlap).unwrap_or(window_len);
        spans.push(start..end);
        start = next_start(text, start..end, chunk_overlap);
    }

    spans
}

/// Find the strongest boundary in `window` that leaves a chunk longer than `min_chars`.
///
/// Returns the byte offset just past the separator.
fn break_point(window: &str, min_chars: usize) -> Option<usize> {
    SEPARATOR_TIERS.iter().find_map(|tier| {
        tier.iter()
            .filter_map(|separator| window.rfind(separator).map(|pos| pos + separator.len()))
            .max()
            .filter(|&end| window[..end].chars().count() > min_chars)
    })
}

/// Where the chunk following `span` begins.
///
/// Backs up at most `chunk_overlap` characters from the end of `span`, then
/// moves forward to the next word start so the overlap does not open mid-word.
/// When the overlap window holds no word start, the next chunk begins at the
/// end of `span` with no overlap.
fn next_start(text: &str, span: Range<usize>, chunk_overlap: usize) -> usize {
    if chunk_overlap == 0 {
        return span.end;
    }

    let chunk = &text[span.clone()];
    // The chunk is longer than the overlap, so this never lands on its first character.
    let back = chunk.char_indices().rev().nth(chunk_overlap - 1).map_or(0, |(i, _)| i);
    let candidate = span.start + back;

    let mid_word = text[..candidate].chars().next_back().is_some_and(|c| !c.is_whitespace());
    if !mid_word {
        return candidate;
    }

    match text[candidate..span.end].char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((pos, c)) if candidate + pos + c.len_utf8() < span.end => {
            candidate + pos + c.len_utf8()
        }
        _ => span.end,
    }
}
