use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docrag::{DocumentChunk, EmbeddingProvider, Metadata};

/// Embeds text as word counts over a fixed vocabulary.
pub struct VocabularyEmbedder {
    vocabulary: Vec<String>,
    calls: AtomicUsize,
    failures: usize,
    delay: Option<Duration>,
}

impl VocabularyEmbedder {
    pub fn new(words: &[&str]) -> Self {
        Self {
            vocabulary: words.iter().map(|w| w.to_lowercase()).collect(),
            calls: AtomicUsize::new(0),
            failures: 0,
            delay: None,
        }
    }

    /// Fail the first `failures` batch calls
    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    /// Sleep before answering each batch call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn text_to_vector(&self, text: &str) -> Vec<f32> {
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
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures {
            bail!("embedding service unavailable (call {})", call + 1);
        }
        Ok(texts.iter().map(|t| self.text_to_vector(t)).collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        Ok(self.text_to_vector(query))
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

pub const TOPIC_VOCABULARY: &[&str] = &[
    "retrieval", "framework", "chains", "agents", "vector", "database", "embeddings", "index",
    "nearest", "ui", "components", "render", "browser", "type", "system", "compiler", "generics",
];

/// Four documents on disjoint topics, same texts as the unit-test corpus
pub fn topic_corpus() -> Vec<DocumentChunk> {
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

pub const CLUSTER_VOCABULARY: &[&str] = &[
    "rust", "ownership", "borrowing", "lifetimes", "memory", "safety", "garden", "tomatoes",
    "soil",
];

/// Five near-duplicate chunks from one source plus one unrelated chunk
pub fn duplicate_cluster_corpus() -> Vec<DocumentChunk> {
    let cluster = [
        "Rust ownership and borrowing rules",
        "Rust ownership, borrowing and lifetimes",
        "Ownership and borrowing in Rust give memory safety",
        "Rust borrowing and ownership explained",
        "Rust ownership borrowing lifetimes memory",
    ];

    let mut chunks: Vec<DocumentChunk> = cluster
        .iter()
        .enumerate()
        .map(|(i, text)| {
            DocumentChunk::new(format!("rust-book#{}", i), *text).with_metadata(
                Metadata::new()
                    .with_source("rust-book")
                    .with_chunk_index(i),
            )
        })
        .collect();

    chunks.push(
        DocumentChunk::new("garden#0", "Growing tomatoes in garden soil")
            .with_metadata(Metadata::new().with_source("garden").with_chunk_index(0)),
    );
    chunks
}
