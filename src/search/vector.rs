use async_trait::async_trait;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::mmr;
use super::similarity::{cosine_similarity, sort_descending, unit_score};
use super::traits::{Retriever, Search};
use super::types::{Provenance, ScoredDocument, SearchResult};
use crate::document::{Document, DocumentChunk, Metadata};
use crate::embeddings::{embed_with_retry, EmbeddingProvider, RetryConfig};
use crate::error::{check_unit_interval, Result, RetrievalError};
use crate::metrics::RetrievalMetrics;

/// Candidate pool size for MMR, as a multiple of `k`
pub const DEFAULT_MMR_FETCH_MULTIPLIER: usize = 3;

#[derive(Default)]
struct StoreState {
    documents: Vec<Arc<Document>>,
    ids: HashSet<String>,
    /// Fixed by the first committed batch
    dimension: Option<usize>,
}

/// In-memory document store answering cosine-similarity queries by brute force.
///
/// Documents keep their insertion order, which also breaks score ties.
/// Reads take a shared lock; appends take the write lock only after the
/// embedding call has returned.
pub struct VectorStore {
    provider: Arc<dyn EmbeddingProvider>,
    state: RwLock<StoreState>,
    retry: RetryConfig,
    mmr_fetch_multiplier: usize,
    metrics: Arc<RetrievalMetrics>,
}

impl VectorStore {
    /// Create an empty store using the given embedding provider
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(StoreState::default()),
            retry: RetryConfig::default(),
            mmr_fetch_multiplier: DEFAULT_MMR_FETCH_MULTIPLIER,
            metrics: Arc::new(RetrievalMetrics::new()),
        }
    }

    /// Set the retry policy for the batch embedding call
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the MMR candidate pool multiplier (minimum 1)
    pub fn with_mmr_fetch_multiplier(mut self, multiplier: usize) -> Self {
        self.mmr_fetch_multiplier = multiplier.max(1);
        self
    }

    /// Report into a shared metrics instance
    pub fn with_metrics(mut self, metrics: Arc<RetrievalMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get a reference to the embedding provider
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        // A panic while holding the lock cannot leave a half-appended batch
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Embed and append a batch of chunks.
    ///
    /// All-or-nothing: if validation or embedding fails, nothing is committed.
    pub async fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<Vec<Arc<Document>>> {
        self.add_documents_with_cancel(chunks, &CancellationToken::new())
            .await
    }

    /// Like [`add_documents`](Self::add_documents), aborting the embedding stage
    /// when `cancel` fires.
    pub async fn add_documents_with_cancel(
        &self,
        chunks: Vec<DocumentChunk>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Arc<Document>>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        validate_batch(&chunks)?;
        {
            let state = self.read();
            check_not_present(&state, &chunks)?;
        }

        // Slow I/O happens before the write lock so readers are never blocked on it
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_with_retry(
            self.provider.as_ref(),
            &texts,
            &self.retry,
            cancel,
            &self.metrics,
        )
        .await?;

        let batch_dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if batch_dimension == 0 {
            return Err(RetrievalError::InvalidDocument(
                "provider returned zero-length vectors".to_string(),
            ));
        }

        let committed: Vec<Arc<Document>> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| Arc::new(Document::from_chunk(chunk, vector)))
            .collect();

        let total = {
            let mut state = self.write();

            if let Some(expected) = state.dimension {
                if expected != batch_dimension {
                    return Err(RetrievalError::DimensionMismatch {
                        expected,
                        actual: batch_dimension,
                    });
                }
            }
            // Another batch may have committed the same ids while we were embedding
            if let Some(dup) = committed.iter().find(|d| state.ids.contains(&d.id)) {
                return Err(RetrievalError::DuplicateDocument { id: dup.id.clone() });
            }

            state.dimension = Some(batch_dimension);
            for document in &committed {
                state.ids.insert(document.id.clone());
                state.documents.push(document.clone());
            }
            state.documents.len()
        };

        self.metrics.documents.set(total as f64);
        self.metrics
            .ingest_latency
            .observe(start.elapsed().as_secs_f64());

        info!(
            provider = self.provider.provider_name(),
            added = committed.len(),
            total,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Documents added to vector store"
        );

        Ok(committed)
    }

    /// The `k` documents most similar to the query, best first.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let ranked = self.rank(query, k).await?;
        Ok(self.finish("vector", query, ranked, start))
    }

    /// Similarity search restricted to documents whose metadata satisfies `predicate`.
    pub async fn similarity_search_with_filter<F>(
        &self,
        query: &str,
        k: usize,
        predicate: F,
    ) -> Result<Vec<SearchResult>>
    where
        F: Fn(&Metadata) -> bool + Send + Sync,
    {
        let start = Instant::now();
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embed_query(query).await?;
        let ranked = self.score(&query_vector, k, predicate)?;
        Ok(self.finish("vector_filtered", query, ranked, start))
    }

    /// Similarity search with a precomputed query vector.
    pub fn similarity_search_by_vector(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let ranked = self.score(query_vector, k, |_| true)?;
        Ok(self.finish("vector", "<vector>", ranked, start))
    }

    /// Diversity-aware search.
    ///
    /// Draws a pool of `multiplier * k` candidates by similarity, then picks
    /// results with maximal marginal relevance. `lambda = 1` reproduces plain
    /// similarity ranking; `lambda = 0` only rewards novelty within the pool.
    /// Results come in selection order, scored by their query relevance.
    pub async fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
        lambda: f32,
    ) -> Result<Vec<SearchResult>> {
        check_unit_interval("lambda", lambda)?;
        let start = Instant::now();

        let pool_size = k.saturating_mul(self.mmr_fetch_multiplier);
        let pool = self.rank(query, pool_size).await?;
        debug!(pool = pool.len(), k, lambda, "Running MMR selection");

        let selected = mmr::select(pool, k, lambda)?;
        Ok(self.finish("mmr", query, selected, start))
    }

    /// Remove every document. The dimension is reset as well.
    pub fn clear(&self) {
        *self.write() = StoreState::default();
        self.metrics.documents.set(0.0);
        info!("Vector store cleared");
    }

    pub fn len(&self) -> usize {
        self.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length shared by all stored documents, once known
    pub fn dimension(&self) -> Option<usize> {
        self.read().dimension
    }

    /// Snapshot of the stored documents in insertion order
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.read().documents.clone()
    }

    /// Raw cosine ranking used by search and fusion
    pub(crate) async fn rank(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embed_query(query).await?;
        self.score(&query_vector, limit, |_| true)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.metrics.embedding_requests.inc();
        let start = Instant::now();
        let vector = self
            .provider
            .embed_query(query)
            .await
            .map_err(RetrievalError::embedding)?;
        self.metrics
            .embedding_latency
            .observe(start.elapsed().as_secs_f64());

        debug!("Generated query embedding with {} dimensions", vector.len());
        Ok(vector)
    }

    fn score<F>(
        &self,
        query_vector: &[f32],
        limit: usize,
        predicate: F,
    ) -> Result<Vec<ScoredDocument>>
    where
        F: Fn(&Metadata) -> bool + Sync,
    {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let state = self.read();
        let Some(dimension) = state.dimension else {
            return Ok(Vec::new());
        };
        if query_vector.len() != dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: query_vector.len(),
            });
        }

        // rayon's collect keeps insertion order, so the stable sort below
        // still breaks ties by insertion
        let mut scored = state
            .documents
            .par_iter()
            .filter(|document| predicate(&document.metadata))
            .map(|document| {
                cosine_similarity(query_vector, &document.vector)
                    .map(|score| ScoredDocument::new(document.clone(), score))
            })
            .collect::<Result<Vec<_>>>()?;
        drop(state);

        sort_descending(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }

    fn finish(
        &self,
        search_type: &'static str,
        query: &str,
        ranked: Vec<ScoredDocument>,
        start: Instant,
    ) -> Vec<SearchResult> {
        let results: Vec<SearchResult> = ranked
            .iter()
            .map(|s| SearchResult::new(&s.document, unit_score(s.score), Provenance::Vector))
            .collect();

        let elapsed = start.elapsed();
        self.metrics
            .observe_search(elapsed.as_secs_f64(), results.len());
        info!(
            search_type,
            query,
            results = results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Vector search completed"
        );

        results
    }
}

/// Ids must be non-empty and unique within the batch
fn validate_batch(chunks: &[DocumentChunk]) -> Result<()> {
    let mut seen = HashSet::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.id.is_empty() {
            return Err(RetrievalError::InvalidDocument(
                "document id must not be empty".to_string(),
            ));
        }
        if !seen.insert(chunk.id.as_str()) {
            return Err(RetrievalError::DuplicateDocument {
                id: chunk.id.clone(),
            });
        }
    }
    Ok(())
}

fn check_not_present(state: &StoreState, chunks: &[DocumentChunk]) -> Result<()> {
    match chunks.iter().find(|c| state.ids.contains(&c.id)) {
        Some(dup) => Err(RetrievalError::DuplicateDocument { id: dup.id.clone() }),
        None => Ok(()),
    }
}

#[async_trait]
impl Search for VectorStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.similarity_search(query, limit).await
    }

    fn search_type(&self) -> &'static str {
        "vector"
    }
}

#[async_trait]
impl Retriever for VectorStore {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        self.rank(query, limit).await
    }

    fn name(&self) -> &'static str {
        "vector"
    }
}
