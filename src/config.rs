use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embeddings::EmbeddingsConfig;
use crate::search::{
    DEFAULT_HYBRID_FETCH_MULTIPLIER, DEFAULT_MMR_FETCH_MULTIPLIER, DEFAULT_VECTOR_WEIGHT,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search defaults and candidate pool sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results to return
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Weight for vector results in hybrid search (0.0 - 1.0)
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Relevance/diversity trade-off for MMR (1.0 = pure relevance)
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// MMR candidate pool size as a multiple of k
    #[serde(default = "default_mmr_fetch_multiplier")]
    pub mmr_fetch_multiplier: usize,

    /// Candidates fetched from each hybrid side as a multiple of k
    #[serde(default = "default_hybrid_fetch_multiplier")]
    pub hybrid_fetch_multiplier: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            vector_weight: default_vector_weight(),
            mmr_lambda: default_mmr_lambda(),
            mmr_fetch_multiplier: default_mmr_fetch_multiplier(),
            hybrid_fetch_multiplier: default_hybrid_fetch_multiplier(),
        }
    }
}

fn default_k() -> usize {
    4
}

fn default_vector_weight() -> f32 {
    DEFAULT_VECTOR_WEIGHT
}

fn default_mmr_lambda() -> f32 {
    0.5
}

fn default_mmr_fetch_multiplier() -> usize {
    DEFAULT_MMR_FETCH_MULTIPLIER
}

fn default_hybrid_fetch_multiplier() -> usize {
    DEFAULT_HYBRID_FETCH_MULTIPLIER
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.vector_weight) {
            bail!("vector_weight must be within [0, 1], got {}", self.vector_weight);
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            bail!("mmr_lambda must be within [0, 1], got {}", self.mmr_lambda);
        }
        if self.mmr_fetch_multiplier == 0 || self.hybrid_fetch_multiplier == 0 {
            bail!("fetch multipliers must be at least 1");
        }
        Ok(())
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write logs to rotating files
    #[serde(default)]
    pub enabled: bool,

    /// Write logs to stderr
    #[serde(default = "default_true")]
    pub stderr: bool,

    /// File log level: trace, debug, info, warn or error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory, relative paths are resolved against the base directory
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Rotation: minutely, hourly, daily or never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stderr: default_true(),
            level: default_log_level(),
            directory: default_log_directory(),
            rotation: default_rotation(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_file_prefix() -> String {
    "docrag.log".to_string()
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration as TOML, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Check value ranges across all sections
    pub fn validate(&self) -> Result<()> {
        self.retrieval
            .validate()
            .context("Invalid [retrieval] section")?;
        self.embeddings
            .validate()
            .context("Invalid [embeddings] section")?;
        Ok(())
    }
}
