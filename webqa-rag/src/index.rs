//! Exact nearest-neighbour vector index over embedded chunks.
//!
//! A [`VectorIndex`] is built once from a full chunk set and never updated in
//! place; rebuilding produces a new index. The [`IndexManifest`] records which
//! embedder produced the vectors so that queries from a different embedding
//! space are rejected instead of silently returning noise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// On-disk schema version written with every index.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Number of chunk texts sent to the embedder per request.
const EMBED_BATCH_SIZE: usize = 64;

/// Describes how an index was built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// Identity of the embedding model that produced the vectors.
    pub embedder_model: String,
    /// Dimensionality of every stored vector.
    pub dimensions: usize,
    /// Number of indexed chunks.
    pub chunk_count: usize,
    /// When the index was built.
    pub created_at: DateTime<Utc>,
}

/// A chunk together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The chunk's embedding vector.
    pub embedding: Vec<f32>,
}

/// An immutable, searchable set of embedded chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    format_version: u32,
    manifest: IndexManifest,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Embed every chunk and construct a fresh index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Chunking`] if `chunks` is empty and
    /// [`RagError::Embedding`] if the embedder fails or returns vectors of
    /// the wrong shape.
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::Chunking("nothing to index: no chunks produced".to_string()));
        }

        let dimensions = embedder.dimensions();
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(embedding_shape_error(
                    embedder,
                    format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
                ));
            }
            debug!(batch_size = texts.len(), "embedded chunk batch");
            embeddings.extend(vectors);
        }

        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimensions) {
            return Err(embedding_shape_error(
                embedder,
                format!("expected {dimensions} dimensions, got {}", bad.len()),
            ));
        }

        let entries: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        let manifest = IndexManifest {
            embedder_model: embedder.model_id().to_string(),
            dimensions,
            chunk_count: entries.len(),
            created_at: Utc::now(),
        };

        info!(
            chunk_count = manifest.chunk_count,
            dimensions,
            embedder = %manifest.embedder_model,
            "built vector index"
        );

        Ok(Self { format_version: INDEX_FORMAT_VERSION, manifest, entries })
    }

    /// The schema version this index was written with.
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// Build metadata for this index.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// All indexed chunks in insertion order.
    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that the manifest agrees with the stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IncompatibleIndex`] for an unknown format version and
    /// a descriptive [`RagError::Storage`] for any other inconsistency.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != INDEX_FORMAT_VERSION {
            return Err(RagError::IncompatibleIndex {
                found: self.format_version,
                expected: INDEX_FORMAT_VERSION,
            });
        }
        if self.entries.len() != self.manifest.chunk_count {
            return Err(RagError::storage(
                "index",
                format!(
                    "manifest lists {} chunks but {} are stored",
                    self.manifest.chunk_count,
                    self.entries.len()
                ),
            ));
        }
        if let Some(entry) = self.entries.iter().find(|e| e.embedding.len() != self.manifest.dimensions)
        {
            return Err(RagError::storage(
                "index",
                format!(
                    "chunk '{}' has {} dimensions, manifest says {}",
                    entry.chunk.id,
                    entry.embedding.len(),
                    self.manifest.dimensions
                ),
            ));
        }
        Ok(())
    }

    /// Reject an embedder whose identity differs from the one that built this index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbedderMismatch`] on a model or dimension mismatch.
    pub fn check_embedder(&self, embedder: &dyn EmbeddingProvider) -> Result<()> {
        if embedder.model_id() != self.manifest.embedder_model
            || embedder.dimensions() != self.manifest.dimensions
        {
            return Err(RagError::EmbedderMismatch {
                indexed: format!("{} ({}d)", self.manifest.embedder_model, self.manifest.dimensions),
                query: format!("{} ({}d)", embedder.model_id(), embedder.dimensions()),
            });
        }
        Ok(())
    }

    /// Embed `query` and return the `k` nearest chunks, closest first.
    ///
    /// Asking for more results than there are chunks returns every chunk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbedderMismatch`] if `embedder` is not the one the
    /// index was built with, and [`RagError::Embedding`] if embedding fails.
    pub async fn search(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.check_embedder(embedder)?;
        let query_embedding = embedder.embed(query).await?;
        if query_embedding.len() != self.manifest.dimensions {
            return Err(embedding_shape_error(
                embedder,
                format!(
                    "query embedding has {} dimensions, index has {}",
                    query_embedding.len(),
                    self.manifest.dimensions
                ),
            ));
        }
        Ok(self.search_by_vector(&query_embedding, k))
    }

    /// Return the `k` chunks nearest to `query_embedding` by Euclidean distance.
    ///
    /// Results are sorted by non-decreasing distance; ties keep insertion order.
    pub fn search_by_vector(&self, query_embedding: &[f32], k: usize) -> Vec<SearchResult> {
        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                distance: euclidean_distance(&entry.embedding, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        scored
    }
}

fn embedding_shape_error(embedder: &dyn EmbeddingProvider, message: String) -> RagError {
    RagError::Embedding { provider: embedder.model_id().to_string(), message }
}

/// Compute the Euclidean (L2) distance between two vectors of equal length.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> Chunk {
        Chunk { id: id.into(), origin: "o".into(), text: id.into(), index: 0, start: 0 }
    }

    fn index_of(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let entries: Vec<IndexedChunk> = vectors
            .into_iter()
            .enumerate()
            .map(|(i, embedding)| IndexedChunk { chunk: chunk(&format!("c{i}")), embedding })
            .collect();
        VectorIndex {
            format_version: INDEX_FORMAT_VERSION,
            manifest: IndexManifest {
                embedder_model: "test".into(),
                dimensions: 2,
                chunk_count: entries.len(),
                created_at: Utc::now(),
            },
            entries,
        }
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let index = index_of(vec![vec![5.0, 5.0], vec![0.0, 0.0], vec![1.0, 1.0]]);
        let results = index.search_by_vector(&[0.0, 0.0], 3);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c0"]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = index_of(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]]);
        let results = index.search_by_vector(&[0.0, 0.0], 3);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["c0", "c1", "c2"]);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = index_of(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(index.search_by_vector(&[0.0, 0.0], 10).len(), 2);
    }

    #[test]
    fn validate_rejects_unknown_version() {
        let mut index = index_of(vec![vec![1.0, 0.0]]);
        index.format_version = 99;
        assert!(matches!(
            index.validate(),
            Err(RagError::IncompatibleIndex { found: 99, expected: INDEX_FORMAT_VERSION })
        ));
    }

    #[test]
    fn validate_rejects_dimension_drift() {
        let mut index = index_of(vec![vec![1.0, 0.0]]);
        index.entries[0].embedding.push(3.0);
        assert!(matches!(index.validate(), Err(RagError::Storage { .. })));
    }
}
