use anyhow::{anyhow, Context, Result};
use async_openai::{
    config::OpenAIConfig as AsyncOpenAIConfig, types::CreateEmbeddingRequestArgs, Client,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::config::OpenAIConfig;
use super::provider::EmbeddingProvider;

/// OpenAI's hard limit on inputs per embeddings request
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Token bucket limiting request rate against the API
struct RateLimiter {
    state: Mutex<BucketState>,
    max_tokens: f64,
    refill_rate: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate,
        }
    }

    async fn acquire(&self, count: usize) {
        let count = (count as f64).min(self.max_tokens);
        loop {
            let wait_time = {
                let mut state = self.state.lock().await;

                let elapsed = state.last_refill.elapsed().as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.max_tokens);
                state.last_refill = Instant::now();

                if state.tokens >= count {
                    state.tokens -= count;
                    return;
                }

                (count - state.tokens) / self.refill_rate
            };

            tokio::time::sleep(Duration::from_secs_f64(wait_time)).await;
        }
    }
}

/// OpenAI embedding provider.
///
/// Does not retry on its own; ingestion retries the whole batch before
/// anything is committed.
pub struct OpenAIProvider {
    client: Client<AsyncOpenAIConfig>,
    config: OpenAIConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(config: &OpenAIConfig) -> Result<Self> {
        let api_key = config
            .load_api_key()
            .context("Failed to load OpenAI API key")?;

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(api_key);

        if let Some(org) = &config.organization {
            openai_config = openai_config.with_org_id(org);
        }

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let client = Client::with_config(openai_config);

        let per_minute = f64::from(config.requests_per_minute.max(1));
        let rate_limiter = Arc::new(RateLimiter::new(per_minute, per_minute / 60.0));

        info!("Initialized OpenAI provider with model: {}", config.model);

        Ok(Self {
            client,
            config: config.clone(),
            rate_limiter,
        })
    }

    /// Get embedding dimension for specific model
    fn get_model_dimension(model_name: &str) -> usize {
        match model_name {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        }
    }

    fn request_batch_size(&self) -> usize {
        self.config.batch_size.clamp(1, MAX_INPUTS_PER_REQUEST)
    }

    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.config.model)
            .input(inputs)
            .build()
            .context("Failed to build OpenAI request")?;

        self.rate_limiter.acquire(1).await;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| anyhow!("OpenAI request timed out after {:?}", timeout))?
            .context("OpenAI API request failed")?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(anyhow!(
                "OpenAI returned {} embeddings for {} inputs",
                data.len(),
                expected
            ));
        }
        // The API tags each embedding with its input position
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.request_batch_size()) {
            let embeddings = self.request(batch.to_vec()).await?;
            all_embeddings.extend(embeddings);
        }

        debug!(
            provider = "openai",
            texts = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Embedded batch"
        );

        Ok(all_embeddings)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.request(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned"))
    }

    fn embedding_dimension(&self) -> usize {
        Self::get_model_dimension(&self.config.model)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn max_batch_size(&self) -> usize {
        self.request_batch_size()
    }
}
