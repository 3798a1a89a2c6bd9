pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod knowledge_base;
pub mod logging;
pub mod metrics;
pub mod search;
pub mod task_group;

#[cfg(test)]
mod test_utils;

pub use chunking::Chunker;
pub use config::{Config, LoggingConfig, RetrievalConfig};
pub use document::{Document, DocumentChunk, Metadata, MetadataFilter, MetadataValue};
pub use embeddings::{create_provider, EmbeddingProvider, EmbeddingsConfig};
pub use error::{Result, RetrievalError};
pub use knowledge_base::KnowledgeBase;
pub use metrics::RetrievalMetrics;
pub use search::{
    HybridRanker, KeywordIndex, Provenance, Retriever, Search, SearchResult, VectorStore,
};
pub use task_group::TaskGroup;
