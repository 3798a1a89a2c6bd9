use anyhow::Result;
use async_trait::async_trait;

/// Capability interface for anything that turns text into vectors.
///
/// Output dimensionality must be constant for a given provider configuration.
/// Vectors are not expected to be stable across model versions.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single query (may have special optimization)
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get provider name for logging and metrics
    fn provider_name(&self) -> &'static str;

    /// Get maximum batch size this provider supports in a single request
    fn max_batch_size(&self) -> usize;
}
