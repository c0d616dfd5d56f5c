//! Error types for the Dokimi evaluation engine
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for error propagation at the edges.
//!
//! Only two conditions are hard failures of an evaluation call: an empty
//! (or malformed) transcript, and a failed generative call. Everything
//! else degrades inside the pipeline and never reaches the caller as an
//! error.

use thiserror::Error;

/// Main error type for Dokimi operations
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Transcript contained no entries; evaluation is refused
    #[error("Transcript is empty; nothing to evaluate")]
    EmptyTranscript,

    /// Transcript violated the input contract (empty question, bad numbering)
    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    /// Generative service unreachable, timed out, or returned empty text
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Vector index query failed (degraded per question, surfaced by clients)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Skill store read or write failed
    #[error("Skill store error: {0}")]
    SkillStore(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Dokimi operations
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Convert anyhow::Error to EvaluationError
impl From<anyhow::Error> for EvaluationError {
    fn from(err: anyhow::Error) -> Self {
        EvaluationError::Other(err.to_string())
    }
}
