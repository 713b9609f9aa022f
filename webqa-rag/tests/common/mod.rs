//! Deterministic stand-ins for the embedding and generation services.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use webqa_rag::{
    EmbeddingProvider, GenerationError, Generator, InMemoryIndexStore, IndexRevision, IndexStore,
    RagConfig, RagError, RagPipeline, VectorIndex,
};

pub const DIM: usize = 64;

/// Bag-of-words embedder: texts sharing words land close together.
pub struct KeywordEmbedder {
    model: String,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::named("keyword-test")
    }

    pub fn named(model: &str) -> Self {
        Self { model: model.to_string() }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> webqa_rag::Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let word = word.to_lowercase();
            let hash = word.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            v[(hash % DIM as u64) as usize] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Embedder returning fixed vectors looked up by exact text.
pub struct TableEmbedder {
    pub table: HashMap<String, Vec<f32>>,
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> webqa_rag::Result<Vec<f32>> {
        self.table.get(text).cloned().ok_or_else(|| RagError::Embedding {
            provider: "table".into(),
            message: format!("no vector for '{text}'"),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "table"
    }
}

/// Embedder that behaves like a provider with a missing credential.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> webqa_rag::Result<Vec<f32>> {
        Err(RagError::Embedding { provider: "failing".into(), message: "API key not set".into() })
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_id(&self) -> &str {
        "keyword-test"
    }
}

/// Generator replaying scripted replies, then answering "stub answer".
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self { replies: Mutex::new(replies.into()), prompts: Mutex::default() }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok("stub answer".to_string()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryIndexStore,
    fail_puts: AtomicBool,
}

impl FlakyStore {
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IndexStore for FlakyStore {
    async fn get(&self) -> webqa_rag::Result<Option<VectorIndex>> {
        self.inner.get().await
    }

    async fn put(&self, index: &VectorIndex) -> webqa_rag::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(RagError::Storage {
                backend: "flaky".into(),
                message: "disk full".into(),
            });
        }
        self.inner.put(index).await
    }

    async fn delete(&self) -> webqa_rag::Result<()> {
        self.inner.delete().await
    }

    async fn revision(&self) -> webqa_rag::Result<Option<IndexRevision>> {
        self.inner.revision().await
    }
}

/// Small chunks, no throttle delay.
pub fn test_config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(50)
        .chunk_overlap(10)
        .top_k(4)
        .min_call_interval(Duration::ZERO)
        .build()
        .unwrap()
}

pub fn pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn IndexStore>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(test_config())
        .embedding_provider(embedder)
        .generator(generator)
        .index_store(store)
        .build()
        .unwrap()
}
