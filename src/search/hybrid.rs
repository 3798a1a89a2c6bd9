//! Hybrid search combining vector similarity and keyword matching.
//!
//! Both rankings are fetched concurrently and merged with [`WeightedFusion`].
//! When one side fails, the other is returned on its own and the search is
//! counted as degraded.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::fusion::WeightedFusion;
use super::traits::{Retriever, Search};
use super::types::SearchResult;
use crate::error::Result;
use crate::metrics::RetrievalMetrics;

/// How many candidates each side contributes per requested result.
pub const DEFAULT_HYBRID_FETCH_MULTIPLIER: usize = 2;

/// Default weight for vector results.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.5;

/// Weighted hybrid ranker over a vector and a keyword retriever.
pub struct HybridRanker {
    /// Semantic side
    vector: Arc<dyn Retriever>,
    /// Lexical side
    keyword: Arc<dyn Retriever>,
    /// Candidates fetched from each side per requested result
    fetch_multiplier: usize,
    /// Weight used by the [`Search`] impl
    default_vector_weight: f32,
    metrics: Arc<RetrievalMetrics>,
}

impl HybridRanker {
    pub fn new(vector: Arc<dyn Retriever>, keyword: Arc<dyn Retriever>) -> Self {
        Self {
            vector,
            keyword,
            fetch_multiplier: DEFAULT_HYBRID_FETCH_MULTIPLIER,
            default_vector_weight: DEFAULT_VECTOR_WEIGHT,
            metrics: Arc::new(RetrievalMetrics::new()),
        }
    }

    /// Set how many candidates each side fetches per requested result.
    pub fn with_fetch_multiplier(mut self, multiplier: usize) -> Self {
        self.fetch_multiplier = multiplier.max(1);
        self
    }

    /// Set the weight used when searching through the [`Search`] trait.
    pub fn with_default_weight(mut self, vector_weight: f32) -> Result<Self> {
        WeightedFusion::new(vector_weight)?;
        self.default_vector_weight = vector_weight;
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: Arc<RetrievalMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn default_vector_weight(&self) -> f32 {
        self.default_vector_weight
    }

    /// Rank by `vector_weight * vector + (1 - vector_weight) * keyword`.
    ///
    /// `vector_weight` is validated before anything is fetched. If exactly one
    /// side fails, the survivor's ranking is returned with full weight; if
    /// both fail, the vector error is returned.
    pub async fn hybrid_search(
        &self,
        query: &str,
        k: usize,
        vector_weight: f32,
    ) -> Result<Vec<SearchResult>> {
        let fusion = WeightedFusion::new(vector_weight)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let fetch_limit = k.saturating_mul(self.fetch_multiplier);

        let (vector_results, keyword_results) = tokio::join!(
            self.vector.retrieve(query, fetch_limit),
            self.keyword.retrieve(query, fetch_limit)
        );

        let (fusion, vector_results, keyword_results) = match (vector_results, keyword_results) {
            (Ok(v), Ok(kw)) => (fusion, v, kw),
            (Ok(v), Err(e)) => {
                warn!(
                    failed = self.keyword.name(),
                    "Keyword search failed, using vector results only: {}", e
                );
                self.metrics.degraded_searches.inc();
                (WeightedFusion::new(1.0)?, v, Vec::new())
            }
            (Err(e), Ok(kw)) => {
                warn!(
                    failed = self.vector.name(),
                    "Vector search failed, using keyword results only: {}", e
                );
                self.metrics.degraded_searches.inc();
                (WeightedFusion::new(0.0)?, Vec::new(), kw)
            }
            (Err(vector_error), Err(keyword_error)) => {
                warn!("Both hybrid sub-searches failed: {}; {}", vector_error, keyword_error);
                return Err(vector_error);
            }
        };

        let fused = fusion.fuse(&vector_results, &keyword_results, k);

        let elapsed = start.elapsed();
        self.metrics
            .observe_search(elapsed.as_secs_f64(), fused.len());
        info!(
            search_type = "hybrid",
            query = query,
            results = fused.len(),
            vector_weight = fusion.vector_weight(),
            vector_candidates = vector_results.len(),
            keyword_candidates = keyword_results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Hybrid search completed"
        );

        Ok(fused)
    }
}

#[async_trait]
impl Search for HybridRanker {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.hybrid_search(query, limit, self.default_vector_weight)
            .await
    }

    fn search_type(&self) -> &'static str {
        "hybrid"
    }
}
