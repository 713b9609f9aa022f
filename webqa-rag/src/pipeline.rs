//! Retrieval-and-answer orchestrator.
//!
//! The [`RagPipeline`] coordinates the full workflow by composing an
//! [`EmbeddingProvider`], a [`Generator`], a [`Chunker`] and an [`IndexStore`]:
//!
//! - [`ingest`](RagPipeline::ingest): chunk → embed → build → persist, replacing any previous index
//! - [`ask`](RagPipeline::ask): search → assemble context → generate → attribute sources
//! - [`reset_index`](RagPipeline::reset_index): delete the persisted index
//!
//! The loaded index is held as an `Arc<VectorIndex>` that is swapped, never
//! mutated, so searches run in parallel with a rebuild against whichever index
//! they started with. Every query compares the cached index against the
//! store's [`IndexRevision`], so a rebuild or reset made by another process
//! is picked up on the next question.
//!
//! # Example
//!
//! ```rust,ignore
//! use webqa_rag::{Document, FileIndexStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generator(Arc::new(my_generator))
//!     .index_store(Arc::new(FileIndexStore::new("vectorstore")))
//!     .build()?;
//!
//! pipeline.ingest(&[Document::new("https://a.test", text)]).await?;
//! let answer = pipeline.ask("What is on the page?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument};

use crate::attribution::attribute_sources;
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{AnswerRecord, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::prompt::{assemble_context, render_prompt};
use crate::resilience::{GenerationOutcome, ResilientGenerator};
use crate::store::{IndexRevision, IndexStore};
use crate::throttle::MinIntervalThrottle;

/// Summary of a successful [`RagPipeline::ingest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of documents that produced at least one chunk.
    pub documents: usize,
    /// Number of chunks in the new index.
    pub chunks: usize,
    /// Dimensionality of the stored vectors.
    pub dimensions: usize,
}

/// The loaded index and the store revision it was read at.
struct CachedIndex {
    revision: IndexRevision,
    index: Arc<VectorIndex>,
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: ResilientGenerator,
    chunker: Arc<dyn Chunker>,
    store: Arc<dyn IndexStore>,
    current: RwLock<Option<CachedIndex>>,
    // Serializes ingest, reset and cache fills.
    mutation: Mutex<()>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the index store.
    pub fn index_store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// Chunk, embed and persist `documents` as the new index.
    ///
    /// The previous index, in memory and in the store, is replaced only after
    /// the new one has been fully built and persisted.
    ///
    /// # Errors
    ///
    /// - [`RagError::Chunking`] if the documents yield no chunks
    /// - [`RagError::Embedding`] if the embedder is unreachable or misconfigured
    /// - [`RagError::Storage`] if persisting fails
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        let _guard = self.mutation.lock().await;

        let mut chunks = Vec::new();
        let mut document_count = 0;
        for document in documents {
            let document_chunks = self.chunker.chunk(document);
            if !document_chunks.is_empty() {
                document_count += 1;
                chunks.extend(document_chunks);
            }
        }
        if chunks.is_empty() {
            return Err(RagError::Chunking(
                "nothing to index: documents are empty".to_string(),
            ));
        }

        let index = VectorIndex::build(chunks, self.embedding_provider.as_ref()).await.map_err(
            |e| {
                error!(error = %e, "failed to build index");
                e
            },
        )?;

        self.store.put(&index).await.map_err(|e| {
            error!(error = %e, "failed to persist index");
            e
        })?;

        let report = IngestReport {
            documents: document_count,
            chunks: index.len(),
            dimensions: index.manifest().dimensions,
        };
        // Another process may have written since our `put`; the next query
        // loads whatever the store holds then.
        self.current.write().await.take();

        info!(documents = report.documents, chunks = report.chunks, "ingested documents");
        Ok(report)
    }

    /// Answer `question` from the current index.
    ///
    /// Generation failures never surface as errors: they produce a degraded
    /// [`AnswerRecord`] with an explanatory message and no sources.
    ///
    /// # Errors
    ///
    /// - [`RagError::NotIndexed`] if nothing has been ingested
    /// - [`RagError::Storage`] / [`RagError::IncompatibleIndex`] if the stored index cannot be loaded
    /// - [`RagError::Embedding`] / [`RagError::EmbedderMismatch`] if the question cannot be embedded
    #[instrument(skip_all)]
    pub async fn ask(&self, question: &str) -> Result<AnswerRecord> {
        let results = self.retrieve(question).await?;

        let context = assemble_context(&results);
        let prompt = render_prompt(&context, question);

        let record = match self.generator.generate(&prompt).await {
            GenerationOutcome::Completed(answer) => AnswerRecord {
                answer,
                sources: attribute_sources(
                    &results,
                    self.config.snippets_per_source,
                    self.config.snippet_chars,
                ),
                degraded: None,
            },
            GenerationOutcome::Degraded { kind, message } => AnswerRecord::degraded(kind, message),
        };

        info!(
            sources = record.sources.len(),
            degraded = record.is_degraded(),
            "answered question"
        );
        Ok(record)
    }

    /// Return the `top_k` chunks nearest to `question`, closest first, without generating.
    ///
    /// # Errors
    ///
    /// Same as [`ask`](RagPipeline::ask).
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let index = self.current_index().await?.ok_or(RagError::NotIndexed)?;
        index.search(self.embedding_provider.as_ref(), question, self.config.top_k).await
    }

    /// Delete the persisted index. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if the store fails to delete an existing index.
    pub async fn reset_index(&self) -> Result<()> {
        let _guard = self.mutation.lock().await;
        self.store.delete().await?;
        self.current.write().await.take();
        info!("index reset");
        Ok(())
    }

    /// The current index, reloading it whenever the store's revision changes.
    ///
    /// Returns `None` when nothing has been indexed.
    pub async fn current_index(&self) -> Result<Option<Arc<VectorIndex>>> {
        let revision = self.store.revision().await?;
        if let Some(index) = self.cached(revision).await {
            return Ok(Some(index));
        }

        let _guard = self.mutation.lock().await;
        // The revision is read before the index, so a concurrent replacement
        // can only cause a redundant reload, never a stale cache.
        let Some(revision) = self.store.revision().await? else {
            self.current.write().await.take();
            return Ok(None);
        };
        if let Some(index) = self.cached(Some(revision)).await {
            return Ok(Some(index));
        }

        let Some(index) = self.store.get().await? else {
            self.current.write().await.take();
            return Ok(None);
        };
        let index = Arc::new(index);
        *self.current.write().await = Some(CachedIndex { revision, index: Arc::clone(&index) });
        info!(chunks = index.len(), "loaded index from store");
        Ok(Some(index))
    }

    async fn cached(&self, revision: Option<IndexRevision>) -> Option<Arc<VectorIndex>> {
        let revision = revision?;
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|cached| cached.revision == revision)
            .map(|cached| Arc::clone(&cached.index))
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider`, `generator` and `index_store` are required.
/// The chunker defaults to a [`RecursiveChunker`] using the configured sizes,
/// and the throttle to a fresh [`MinIntervalThrottle`] using the configured
/// interval; pass a shared throttle to pace several pipelines together.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn Generator>>,
    chunker: Option<Arc<dyn Chunker>>,
    store: Option<Arc<dyn IndexStore>>,
    throttle: Option<Arc<MinIntervalThrottle>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the text generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the index store.
    pub fn index_store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an existing throttle instead of creating one.
    pub fn throttle(mut self, throttle: Arc<MinIntervalThrottle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if any required field is missing or
    /// the default chunker cannot be created from the config.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self
            .config
            .ok_or_else(|| RagError::Configuration("config is required".to_string()))?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::Configuration("embedding_provider is required".to_string())
        })?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::Configuration("generator is required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| RagError::Configuration("index_store is required".to_string()))?;

        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?),
        };
        let throttle = self
            .throttle
            .unwrap_or_else(|| Arc::new(MinIntervalThrottle::new(config.min_call_interval)));

        Ok(RagPipeline {
            config,
            embedding_provider,
            generator: ResilientGenerator::new(generator, throttle),
            chunker,
            store,
            current: RwLock::new(None),
            mutation: Mutex::new(()),
        })
    }
}
