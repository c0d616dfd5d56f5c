//! Configuration for the Dokimi evaluation engine
//!
//! Config structs default from environment variables and validate eagerly,
//! so misconfiguration fails at construction time rather than mid-pipeline.

use crate::error::{EvaluationError, Result};
use std::env;

/// Engine-level tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum similarity for a retrieved reference to be usable
    pub similarity_threshold: f32,

    /// How many candidates to fetch per retrieval query
    pub retrieval_top_k: usize,

    /// Upper bound on the single generative call, in seconds
    pub generation_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: env_parse("DOKIMI_SIMILARITY_THRESHOLD", 0.5),
            retrieval_top_k: env_parse("DOKIMI_RETRIEVAL_TOP_K", 3),
            generation_timeout_secs: env_parse("DOKIMI_GENERATION_TIMEOUT_SECS", 60),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                format!(
                    "similarity_threshold must be in [0.0, 1.0], got {}",
                    self.similarity_threshold
                ),
            )));
        }
        if self.retrieval_top_k == 0 {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "retrieval_top_k must be at least 1".to_string(),
            )));
        }
        if self.generation_timeout_secs == 0 {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "generation_timeout_secs must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

/// Configuration for the generative evaluator service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Anthropic API key
    pub api_key: String,

    /// Model to use (default: claude-3-5-haiku-20241022)
    pub model: String,

    /// Max tokens for responses
    pub max_tokens: usize,

    /// Temperature for sampling; low, since grading should be stable
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "ANTHROPIC_API_KEY not set".to_string(),
            )));
        }
        if self.max_tokens == 0 {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "max_tokens must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

/// Configuration for local embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Model name; must match the model the knowledge base was embedded with
    pub model: String,

    /// Cache directory for downloaded model files
    pub cache_dir: Option<std::path::PathBuf>,

    /// Batch size for embedding calls
    pub batch_size: usize,

    /// Whether to show a progress bar on first model download
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: env::var("DOKIMI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
            cache_dir: env::var("DOKIMI_EMBEDDING_CACHE").ok().map(Into::into),
            batch_size: env_parse("DOKIMI_EMBEDDING_BATCH_SIZE", 32),
            show_download_progress: false,
        }
    }
}

impl EmbeddingConfig {
    /// Embedding dimensionality of the configured model
    pub fn dimensions(&self) -> usize {
        match self.model.as_str() {
            "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" | "bge-small-en-v1.5" => 384,
            "bge-base-en-v1.5" | "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => 768,
            "bge-large-en-v1.5" => 1024,
            _ => 384,
        }
    }

    pub fn validate(&self) -> Result<()> {
        const SUPPORTED: &[&str] = &[
            "all-MiniLM-L6-v2",
            "all-MiniLM-L12-v2",
            "bge-small-en-v1.5",
            "bge-base-en-v1.5",
            "bge-large-en-v1.5",
            "nomic-embed-text-v1",
            "nomic-embed-text-v1.5",
        ];
        if !SUPPORTED.contains(&self.model.as_str()) {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                format!(
                    "Unsupported embedding model '{}'. Supported: {}",
                    self.model,
                    SUPPORTED.join(", ")
                ),
            )));
        }
        if self.batch_size == 0 {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "batch_size must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

/// Connection settings for the Qdrant reference index
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Base URL of the Qdrant instance
    pub url: String,

    /// API key, if the instance requires one
    pub api_key: Option<String>,

    /// Collection holding the reference question/answer pairs
    pub collection: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: env::var("QDRANT_URL").unwrap_or_default(),
            api_key: env::var("QDRANT_API_KEY").ok(),
            collection: env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "reference_questions".to_string()),
            timeout_secs: 30,
        }
    }
}

impl QdrantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "QDRANT_URL not set".to_string(),
            )));
        }
        if self.collection.is_empty() {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                "collection name cannot be empty".to_string(),
            )));
        }
        Ok(())
    }
}

/// Settings for reference knowledge-base curation
#[derive(Debug, Clone)]
pub struct CurationConfig {
    /// Similarity at or above which a question counts as already present
    pub dedup_threshold: f32,

    /// How many candidates to inspect per duplicate check
    pub dedup_top_k: usize,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: env_parse("DOKIMI_CURATION_DEDUP_THRESHOLD", 0.85),
            dedup_top_k: 5,
        }
    }
}

impl CurationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.dedup_threshold) {
            return Err(EvaluationError::Config(config::ConfigError::Message(
                format!(
                    "dedup_threshold must be in [0.0, 1.0], got {}",
                    self.dedup_threshold
                ),
            )));
        }
        Ok(())
    }
}

/// Parse an env var, falling back to a default on absence or parse failure
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval_top_k, 3);
    }

    #[test]
    fn test_engine_config_rejects_bad_threshold() {
        let config = EngineConfig {
            similarity_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_embedding_config_dimensions() {
        let config = EmbeddingConfig {
            model: "all-MiniLM-L6-v2".to_string(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(config.dimensions(), 384);

        let config = EmbeddingConfig {
            model: "bge-base-en-v1.5".to_string(),
            ..EmbeddingConfig::default()
        };
        assert_eq!(config.dimensions(), 768);
    }

    #[test]
    fn test_embedding_config_rejects_unknown_model() {
        let config = EmbeddingConfig {
            model: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_qdrant_config_requires_url() {
        let config = QdrantConfig {
            url: String::new(),
            ..QdrantConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_curation_config_defaults_validate() {
        let config = CurationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dedup_top_k, 5);
    }
}
