//! Search module providing vector, keyword, and hybrid search capabilities.
//!
//! This module contains:
//! - `traits` - Common `Search` and `Retriever` traits
//! - `vector` - Semantic vector search, filtered search and MMR
//! - `keyword` - Literal term-frequency keyword search
//! - `hybrid` - Hybrid search combining both with weighted score fusion

pub mod fusion;
pub mod hybrid;
pub mod keyword;
pub mod mmr;
pub mod similarity;
pub mod traits;
mod types;
mod vector;

// Re-export commonly used types
pub use fusion::{min_max_normalize, WeightedFusion};
pub use hybrid::{HybridRanker, DEFAULT_HYBRID_FETCH_MULTIPLIER, DEFAULT_VECTOR_WEIGHT};
pub use keyword::KeywordIndex;
pub use similarity::{cosine_similarity, unit_score};
pub use traits::{Retriever, Search};
pub use types::{Provenance, ScoredDocument, SearchResult};
pub use vector::{VectorStore, DEFAULT_MMR_FETCH_MULTIPLIER};
