//! Search traits for polymorphic search implementations.
//!
//! `Search` is the caller-facing interface returning normalized results.
//! `Retriever` is the lower-level interface the hybrid ranker fuses: it
//! yields raw, per-scorer scores so they can be normalized together.

use async_trait::async_trait;

use super::types::{ScoredDocument, SearchResult};
use crate::error::Result;

/// Common trait for all search implementations.
///
/// Implemented by the vector store (plain similarity), the keyword index and
/// the hybrid ranker (with its configured default weight).
#[async_trait]
pub trait Search: Send + Sync {
    /// Search for relevant documents.
    ///
    /// Returns at most `limit` results sorted by relevance (highest score first).
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Get the search type identifier, such as "vector", "keyword" or "hybrid".
    fn search_type(&self) -> &'static str;
}

/// A source of raw-scored candidates for fusion.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `limit` candidates, best first, with scores in the scorer's own scale.
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}
