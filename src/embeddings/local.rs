//! Local embedding service using fastembed
//!
//! Runs the sentence-embedding model locally via ONNX Runtime. The model is
//! downloaded on first use into the cache directory and loaded from cache on
//! subsequent runs. The default model must match the one the reference
//! knowledge base was indexed with, or similarity scores are meaningless.

use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingService;
use crate::error::{EvaluationError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info};

/// Local embedding service using fastembed
pub struct LocalEmbeddingService {
    /// The underlying fastembed model (fastembed needs &mut, so the model
    /// sits behind a mutex and every call goes through the blocking pool)
    model: Arc<Mutex<TextEmbedding>>,
    config: EmbeddingConfig,
    dimensions: usize,
}

impl LocalEmbeddingService {
    /// Create a new local embedding service with the given configuration
    ///
    /// Downloads the model if it is not already cached, which may take a
    /// while on first use.
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing local embedding service: model={}, cache={:?}",
            config.model, config.cache_dir
        );

        let embedding_model = Self::model_name_to_enum(&config.model)?;

        let mut init_options = InitOptions::new(embedding_model)
            .with_show_download_progress(config.show_download_progress);
        if let Some(dir) = config.cache_dir.clone() {
            init_options = init_options.with_cache_dir(dir);
        }

        // Model load may download; keep it off the async runtime.
        let model = task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .map_err(|e| EvaluationError::Other(format!("Task join error: {}", e)))?
            .map_err(|e| EvaluationError::Embedding(format!("Failed to load model: {}", e)))?;

        let dimensions = config.dimensions();

        info!(
            "Local embedding service ready: {} dimensions",
            dimensions
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
            dimensions,
        })
    }

    /// Map model name string to fastembed's EmbeddingModel enum
    fn model_name_to_enum(model_name: &str) -> Result<EmbeddingModel> {
        match model_name {
            "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
            "nomic-embed-text-v1" => Ok(EmbeddingModel::NomicEmbedTextV1),
            "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
            _ => Err(EvaluationError::Config(config::ConfigError::Message(
                format!(
                    "Unsupported model: '{}'. See EmbeddingConfig::validate() for supported models.",
                    model_name
                ),
            ))),
        }
    }

    /// Embed a batch of texts in a blocking task
    async fn embed_batch_internal(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts", texts.len());

        let model = Arc::clone(&self.model);
        let dimensions = self.dimensions;

        let embeddings = task::spawn_blocking(move || {
            let mut model_guard = model
                .lock()
                .map_err(|e| format!("Mutex lock failed: {}", e))?;

            model_guard
                .embed(texts, None)
                .map_err(|e| format!("Embedding generation failed: {}", e))
        })
        .await
        .map_err(|e| EvaluationError::Other(format!("Task join error: {}", e)))?
        .map_err(EvaluationError::Embedding)?;

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimensions {
                return Err(EvaluationError::Embedding(format!(
                    "Embedding {} has wrong dimensions: expected {}, got {}",
                    i,
                    dimensions,
                    embedding.len()
                )));
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(EvaluationError::Embedding(
                "Text cannot be empty".to_string(),
            ));
        }

        let texts = vec![text.to_string()];
        let mut embeddings = self.embed_batch_internal(texts).await?;

        embeddings
            .pop()
            .ok_or_else(|| EvaluationError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (i, text) in texts.iter().enumerate() {
            if text.is_empty() {
                return Err(EvaluationError::Embedding(format!(
                    "Text at index {} cannot be empty",
                    i
                )));
            }
        }

        let texts_owned: Vec<String> = texts.iter().map(|s| s.to_string()).collect();

        let batch_size = self.config.batch_size;
        let mut all_embeddings = Vec::new();

        for chunk in texts_owned.chunks(batch_size) {
            let chunk_embeddings = self.embed_batch_internal(chunk.to_vec()).await?;
            all_embeddings.extend(chunk_embeddings);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_mapping() {
        assert!(LocalEmbeddingService::model_name_to_enum("all-MiniLM-L6-v2").is_ok());
        assert!(LocalEmbeddingService::model_name_to_enum("bge-base-en-v1.5").is_ok());
        assert!(LocalEmbeddingService::model_name_to_enum("invalid-model").is_err());
    }

    // Integration tests with real model downloads
    // NOTE: run with --test-threads=1 to avoid concurrent model loading:
    // cargo test --lib embeddings::local::tests --release -- --test-threads=1
    #[tokio::test]
    #[ignore] // Downloads a model on first run
    async fn test_embed_single_text() {
        let config = EmbeddingConfig::default();
        let service = LocalEmbeddingService::new(config).await.unwrap();

        let embedding = service.embed("What is a Python decorator?").await.unwrap();

        // all-MiniLM-L6-v2 has 384 dimensions
        assert_eq!(embedding.len(), 384);
        for &val in &embedding {
            assert!(val.is_finite());
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_similar_questions_embed_closer() {
        let config = EmbeddingConfig::default();
        let service = LocalEmbeddingService::new(config).await.unwrap();

        let embed1 = service.embed("What is a Python decorator?").await.unwrap();
        let embed2 = service
            .embed("Explain decorators in Python")
            .await
            .unwrap();
        let embed3 = service
            .embed("How do you season a cast iron pan?")
            .await
            .unwrap();

        let sim_similar = crate::embeddings::cosine_similarity(&embed1, &embed2);
        let sim_different = crate::embeddings::cosine_similarity(&embed1, &embed3);

        assert!(sim_similar > sim_different);
    }
}
