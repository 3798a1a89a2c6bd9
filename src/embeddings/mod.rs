mod config;
#[cfg(feature = "fastembed")]
mod fastembed_provider;
mod mock;
mod openai_provider;
mod provider;
mod retry;

// Re-export public interfaces
pub use config::{
    EmbeddingsConfig, FastEmbedConfig, MockConfig, OpenAIConfig, ProviderType, RetryConfig,
};
#[cfg(feature = "fastembed")]
pub use fastembed_provider::FastEmbedProvider;
pub use mock::MockEmbedder;
pub use openai_provider::OpenAIProvider;
pub use provider::EmbeddingProvider;
pub use retry::embed_with_retry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Build the provider selected in the configuration
pub fn create_provider(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        ProviderType::Mock => Arc::new(MockEmbedder::new(config.mock.dimension)),
        ProviderType::OpenAI => {
            let openai = config
                .openai
                .as_ref()
                .context("OpenAI configuration not provided")?;
            Arc::new(OpenAIProvider::new(openai)?)
        }
        ProviderType::FastEmbed => create_fastembed(config)?,
    };

    info!(
        provider = provider.provider_name(),
        dimension = provider.embedding_dimension(),
        "Embedding provider ready"
    );
    Ok(provider)
}

#[cfg(feature = "fastembed")]
fn create_fastembed(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let fastembed = config.fastembed.clone().unwrap_or_default();
    Ok(Arc::new(FastEmbedProvider::new(&fastembed)?))
}

#[cfg(not(feature = "fastembed"))]
fn create_fastembed(_config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!("the fastembed provider requires building with the \"fastembed\" feature")
}
