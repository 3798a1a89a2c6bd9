use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Provider type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Deterministic hash embeddings, no model required
    #[default]
    Mock,
    OpenAI,
    FastEmbed,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::OpenAI => write!(f, "openai"),
            Self::FastEmbed => write!(f, "fastembed"),
        }
    }
}

/// Embedding provider selection and settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Active provider
    #[serde(default)]
    pub provider: ProviderType,

    #[serde(default)]
    pub mock: MockConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAIConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastembed: Option<FastEmbedConfig>,

    /// Retry policy for batch embedding during ingestion
    #[serde(default)]
    pub retry: RetryConfig,
}

impl EmbeddingsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mock.dimension == 0 {
            bail!("embeddings.mock.dimension must be greater than zero");
        }
        if self.provider == ProviderType::OpenAI && self.openai.is_none() {
            bail!("provider \"openai\" needs an [embeddings.openai] section");
        }
        self.retry.validate().context("Invalid [embeddings.retry] section")
    }
}

/// Mock provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_mock_dimension")]
    pub dimension: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: default_mock_dimension(),
        }
    }
}

fn default_mock_dimension() -> usize {
    384
}

/// FastEmbed provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastEmbedConfig {
    #[serde(default = "default_fastembed_model")]
    pub model: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model: default_fastembed_model(),
            batch_size: default_batch_size(),
            cache_dir: None,
        }
    }
}

fn default_fastembed_model() -> String {
    "bge-small-en-v1.5".to_string()
}

fn default_batch_size() -> usize {
    32
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key (can be environment variable reference like ${OPENAI_API_KEY})
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>, // For Azure or custom endpoints

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_openai_batch_size")]
    pub batch_size: usize,

    /// Requests per minute allowed by the rate limiter
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_openai_model(),
            organization: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            batch_size: default_openai_batch_size(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_openai_batch_size() -> usize {
    100
}

fn default_requests_per_minute() -> u32 {
    3500
}

impl OpenAIConfig {
    /// Load API key from configuration or environment variable
    pub fn load_api_key(&self) -> Result<String> {
        // 1. Explicit configuration
        if !self.api_key.is_empty() && !self.api_key.starts_with("${") {
            return Ok(self.api_key.clone());
        }

        // 2. Environment variable reference
        if self.api_key.starts_with("${") && self.api_key.ends_with('}') {
            let var_name = &self.api_key[2..self.api_key.len() - 1];
            return std::env::var(var_name)
                .with_context(|| format!("Environment variable {} not set", var_name));
        }

        // 3. Standard environment variable
        std::env::var("OPENAI_API_KEY")
            .context("No API key configured and OPENAI_API_KEY environment variable not set")
    }
}

/// Retry configuration for the embedding fetch stage.
///
/// Retries happen before any document is appended, so a retried batch can
/// never be inserted twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,

    /// Deadline for the whole embedding stage including retries (None = no deadline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            exponential_base: default_exponential_base(),
            timeout_ms: None,
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if !(self.exponential_base >= 1.0) {
            bail!("exponential_base must be >= 1.0, got {}", self.exponential_base);
        }
        Ok(())
    }
}

fn default_retry_max_attempts() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    10000
}

fn default_exponential_base() -> f64 {
    2.0
}
