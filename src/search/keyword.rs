//! Literal term-frequency keyword scoring.
//!
//! Query terms are matched as plain substrings of the lowercased document
//! text; no character in a term has special meaning. Scoring is a linear
//! scan, O(documents x terms) per query, which suits small and medium corpora.

use async_trait::async_trait;
use rayon::prelude::*;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Instant;
use tracing::{debug, info};

use super::similarity::sort_descending;
use super::traits::{Retriever, Search};
use super::types::{Provenance, ScoredDocument, SearchResult};
use crate::document::Document;
use crate::error::Result;
use crate::metrics::RetrievalMetrics;

struct IndexedText {
    document: Arc<Document>,
    lowered: String,
}

/// Keyword index over documents shared with the vector store.
pub struct KeywordIndex {
    entries: RwLock<Vec<IndexedText>>,
    metrics: Arc<RetrievalMetrics>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            metrics: Arc::new(RetrievalMetrics::new()),
        }
    }

    /// Report into a shared metrics instance
    pub fn with_metrics(mut self, metrics: Arc<RetrievalMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<IndexedText>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add documents by reference; nothing is vectorized.
    pub fn add_documents(&self, documents: &[Arc<Document>]) {
        let indexed: Vec<IndexedText> = documents
            .iter()
            .map(|document| IndexedText {
                document: document.clone(),
                lowered: document.text.to_lowercase(),
            })
            .collect();

        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.extend(indexed);
        debug!("Added {} documents to keyword index", documents.len());
    }

    /// The `k` documents with the most literal term occurrences.
    ///
    /// Scores are divided by the best score so the top hit gets 1.0.
    /// Documents without any occurrence are never returned, so an empty query
    /// yields an empty list.
    pub fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let start = Instant::now();
        let ranked = self.rank(query, k);

        let max_score = ranked.first().map(|s| s.score).unwrap_or(0.0);
        let results: Vec<SearchResult> = ranked
            .iter()
            .map(|s| {
                let score = if max_score > 0.0 { s.score / max_score } else { 0.0 };
                SearchResult::new(&s.document, score, Provenance::Keyword)
            })
            .collect();

        let elapsed = start.elapsed();
        self.metrics
            .observe_search(elapsed.as_secs_f64(), results.len());
        info!(
            search_type = "keyword",
            query = query,
            results = results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Keyword search completed"
        );

        results
    }

    /// Raw term counts, best first
    pub(crate) fn rank(&self, query: &str, limit: usize) -> Vec<ScoredDocument> {
        let terms = tokenize(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let entries = self.read();
        let mut scored: Vec<ScoredDocument> = entries
            .par_iter()
            .filter_map(|entry| {
                let count = term_frequency(&entry.lowered, &terms);
                (count > 0).then(|| ScoredDocument::new(entry.document.clone(), count as f32))
            })
            .collect();
        drop(entries);

        sort_descending(&mut scored);
        scored.truncate(limit);
        scored
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        info!("Keyword index cleared");
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase and split on whitespace
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Sum of non-overlapping literal occurrences of each term in `lowered_text`.
///
/// Repeated query terms count once per repetition.
pub fn term_frequency(lowered_text: &str, terms: &[String]) -> usize {
    terms
        .iter()
        .map(|term| lowered_text.matches(term.as_str()).count())
        .sum()
}

#[async_trait]
impl Search for KeywordIndex {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        Ok(KeywordIndex::search(self, query, limit))
    }

    fn search_type(&self) -> &'static str {
        "keyword"
    }
}

#[async_trait]
impl Retriever for KeywordIndex {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        Ok(self.rank(query, limit))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
