//! Explicit knowledge-base instance owning the stores of one corpus.
//!
//! Nothing here is global: applications create a [`KnowledgeBase`] and pass
//! it (or an `Arc` of it) to whatever needs to search.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::chunking::Chunker;
use crate::config::{Config, RetrievalConfig};
use crate::document::{Document, DocumentChunk, MetadataFilter};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::error::Result;
use crate::metrics::RetrievalMetrics;
use crate::search::{HybridRanker, KeywordIndex, SearchResult, VectorStore};
use crate::task_group::TaskGroup;

/// A vector store and keyword index kept in sync over one document set.
pub struct KnowledgeBase {
    store: Arc<VectorStore>,
    keyword: Arc<KeywordIndex>,
    hybrid: Arc<HybridRanker>,
    metrics: Arc<RetrievalMetrics>,
    config: RetrievalConfig,
    /// Serializes ingestion so both indexes see batches in the same order
    ingest_lock: Mutex<()>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base using `provider` and the given configuration.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let metrics = Arc::new(RetrievalMetrics::new());
        let retrieval = config.retrieval.clone();

        let store = Arc::new(
            VectorStore::new(provider)
                .with_retry(config.embeddings.retry.clone())
                .with_mmr_fetch_multiplier(retrieval.mmr_fetch_multiplier)
                .with_metrics(metrics.clone()),
        );
        let keyword = Arc::new(KeywordIndex::new().with_metrics(metrics.clone()));
        let hybrid = Arc::new(
            HybridRanker::new(store.clone(), keyword.clone())
                .with_fetch_multiplier(retrieval.hybrid_fetch_multiplier)
                .with_default_weight(retrieval.vector_weight)?
                .with_metrics(metrics.clone()),
        );

        Ok(Self {
            store,
            keyword,
            hybrid,
            metrics,
            config: retrieval,
            ingest_lock: Mutex::new(()),
        })
    }

    /// Create a knowledge base with the provider selected in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = create_provider(&config.embeddings)?;
        Self::new(provider, config)
    }

    /// Embed and add a batch to both indexes. All-or-nothing.
    pub async fn ingest(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        self.ingest_with_cancel(chunks, &CancellationToken::new())
            .await
    }

    /// Like [`ingest`](Self::ingest), aborting the embedding stage when `cancel` fires.
    pub async fn ingest_with_cancel(
        &self,
        chunks: Vec<DocumentChunk>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let _guard = self.ingest_lock.lock().await;

        let documents = self.store.add_documents_with_cancel(chunks, cancel).await?;
        self.keyword.add_documents(&documents);

        Ok(documents.len())
    }

    /// Chunk `text` from `source` and ingest the chunks.
    pub async fn ingest_text(&self, source: &str, text: &str, chunker: &Chunker) -> Result<usize> {
        let chunks = chunker.chunk(source, text);
        info!(source, chunks = chunks.len(), "Chunked source text");
        self.ingest(chunks).await
    }

    /// Hybrid search with the configured default `k` and vector weight.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.hybrid_search(query, self.config.default_k, self.config.vector_weight)
            .await
    }

    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.store.similarity_search(query, k).await
    }

    /// Similarity search over documents matching `filter`.
    pub async fn similarity_search_with_filter(
        &self,
        query: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        self.store
            .similarity_search_with_filter(query, k, |metadata| filter.matches(metadata))
            .await
    }

    pub fn similarity_search_by_vector(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.store.similarity_search_by_vector(query_vector, k)
    }

    pub async fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
        lambda: f32,
    ) -> Result<Vec<SearchResult>> {
        self.store
            .max_marginal_relevance_search(query, k, lambda)
            .await
    }

    /// MMR search with the configured default `k` and lambda.
    pub async fn diverse_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.max_marginal_relevance_search(query, self.config.default_k, self.config.mmr_lambda)
            .await
    }

    pub fn keyword_search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        self.keyword.search(query, k)
    }

    pub async fn hybrid_search(
        &self,
        query: &str,
        k: usize,
        vector_weight: f32,
    ) -> Result<Vec<SearchResult>> {
        self.hybrid.hybrid_search(query, k, vector_weight).await
    }

    /// Run several named hybrid queries concurrently and collect them by name.
    ///
    /// With a `deadline`, queries still running when it passes report
    /// [`RetrievalError::Cancelled`](crate::RetrievalError::Cancelled).
    pub async fn multi_search(
        &self,
        queries: &[(&str, &str)],
        k: usize,
        deadline: Option<Duration>,
    ) -> Result<HashMap<String, Result<Vec<SearchResult>>>> {
        let mut group = match deadline {
            Some(timeout) => TaskGroup::with_deadline(timeout),
            None => TaskGroup::new(),
        };

        let vector_weight = self.config.vector_weight;
        for (name, query) in queries {
            let hybrid = self.hybrid.clone();
            let query = query.to_string();
            group.spawn(*name, async move {
                hybrid.hybrid_search(&query, k, vector_weight).await
            })?;
        }

        Ok(group.join().await)
    }

    /// Remove every document from both indexes.
    pub async fn clear(&self) {
        let _guard = self.ingest_lock.lock().await;
        self.store.clear();
        self.keyword.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Snapshot of the stored documents in insertion order
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.store.documents()
    }

    pub fn metrics(&self) -> &Arc<RetrievalMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn keyword_index(&self) -> &Arc<KeywordIndex> {
        &self.keyword
    }
}
