//! Deterministic fake providers shared by unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::document::{DocumentChunk, Metadata};
use crate::embeddings::EmbeddingProvider;

/// Embeds text as term counts over a fixed vocabulary.
///
/// Texts sharing vocabulary words point in similar directions, which gives
/// tests real topical structure without a model.
pub struct VocabularyEmbedder {
    vocabulary: Vec<String>,
}

impl VocabularyEmbedder {
    pub fn new(words: &[&str]) -> Self {
        Self {
            vocabulary: words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        self.vocabulary
            .iter()
            .map(|word| tokens.iter().filter(|t| *t == word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for VocabularyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        Ok(self.vector(query))
    }

    fn embedding_dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn provider_name(&self) -> &'static str {
        "vocabulary"
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }
}

/// Returns hand-picked vectors for known texts.
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl FixedEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            dimension,
        }
    }

    fn lookup(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("no fixed vector for {:?}", text))
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.lookup(t)).collect()
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.lookup(query)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }
}

/// Fails the first `failures` calls, then returns constant vectors.
pub struct FlakyEmbedder {
    dimension: usize,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(dimension: usize, failures: usize) -> Self {
        Self {
            dimension,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn attempt(&self) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(anyhow!("provider unavailable (call {})", call + 1))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.attempt()?;
        Ok(texts.iter().map(|_| vec![1.0; self.dimension]).collect())
    }

    async fn embed_query(&self, _query: &str) -> Result<Vec<f32>> {
        self.attempt()?;
        Ok(vec![1.0; self.dimension])
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &'static str {
        "flaky"
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }
}

/// Vocabulary covering the topic corpus below
pub const TOPIC_VOCABULARY: &[&str] = &[
    "retrieval", "framework", "chains", "agents", "vector", "database", "embeddings", "index",
    "nearest", "ui", "components", "render", "browser", "type", "system", "compiler", "generics",
];

/// Four documents on disjoint topics
pub fn topic_chunks() -> Vec<DocumentChunk> {
    vec![
        DocumentChunk::new(
            "framework",
            "A retrieval framework that composes chains and agents around a retrieval step.",
        )
        .with_metadata(Metadata::new().with_source("framework.md").with_field("topic", "llm")),
        DocumentChunk::new(
            "vectordb",
            "A vector database stores embeddings in an index and answers nearest vector queries.",
        )
        .with_metadata(Metadata::new().with_source("vectordb.md").with_field("topic", "storage")),
        DocumentChunk::new(
            "ui",
            "A UI framework renders components in the browser and keeps UI components in sync.",
        )
        .with_metadata(Metadata::new().with_source("ui.md").with_field("topic", "frontend")),
        DocumentChunk::new(
            "types",
            "A type system lets the compiler check generics and every type before runtime.",
        )
        .with_metadata(
            Metadata::new()
                .with_source("types.md")
                .with_field("topic", "languages")
                .with_field("reviewed", true),
        ),
    ]
}
