//! Dokimi - Reference-Grounded Interview Evaluation Engine
//!
//! Evaluates interview transcripts against a vector knowledge base of
//! reference answers and tracks per-user skill proficiency over time:
//! - Per-question reference retrieval with graceful degradation
//! - Structured multi-dimension assessment via a generative model
//! - Strict response validation with a well-formed fallback
//! - Fixed-weight score aggregation
//! - Conservative (one step per call) skill-level updates
//!
//! # Architecture
//!
//! The engine is a pipeline over three collaborator seams:
//! - **VectorIndex**: embedded reference question/answer pairs (Qdrant)
//! - **GenerativeEvaluator**: one-shot structured grading (Anthropic)
//! - **SkillStore**: per-user proficiency persistence (SQLite)
//!
//! # Example
//!
//! ```ignore
//! use dokimi::{
//!     EvaluationEngine, EvaluationRequest, TranscriptEntry, UserId,
//! };
//! use dokimi::config::{EmbeddingConfig, EngineConfig, LlmConfig, QdrantConfig};
//! use dokimi::embeddings::LocalEmbeddingService;
//! use dokimi::index::QdrantIndex;
//! use dokimi::services::LlmService;
//! use dokimi::storage::SqliteSkillStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = Arc::new(LocalEmbeddingService::new(EmbeddingConfig::default()).await?);
//!     let index = Arc::new(QdrantIndex::new(QdrantConfig::default(), embedder)?);
//!     let evaluator = Arc::new(LlmService::new(LlmConfig::default())?);
//!     let store = Arc::new(SqliteSkillStore::open("skills.db")?);
//!
//!     let engine = EvaluationEngine::new(index, evaluator, store, EngineConfig::default())?;
//!
//!     let request = EvaluationRequest::new(vec![TranscriptEntry::new(
//!         1,
//!         "What is a Python decorator?",
//!         "A function that wraps another function",
//!     )]);
//!     let result = engine.evaluate_stored(UserId::new(), &request).await?;
//!
//!     println!("{}", dokimi::metrics::summary_line(&result));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod curation;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod metrics;
pub mod parser;
pub mod prompt;
pub mod retrieval;
pub mod scoring;
pub mod services;
pub mod skills;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use engine::EvaluationEngine;
pub use error::{EvaluationError, Result};
pub use types::{
    AnswerAssessment, DimensionScore, EvaluationRequest, EvaluationResult, InterviewContext,
    ReferenceCoverage, ReferencePair, SkillDelta, SkillSnapshot, TranscriptEntry, UserId,
};
