//! Reference knowledge-base index
//!
//! The index holds embedded reference question/answer pairs and answers
//! "top-K most similar" queries. The engine only ever talks to it through
//! the [`VectorIndex`] trait; the production implementation is a Qdrant
//! HTTP client.

pub mod qdrant;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use qdrant::QdrantIndex;

/// One search hit from the reference index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceHit {
    /// The stored reference question
    pub question: String,

    /// The stored reference answer
    pub answer: String,

    /// Similarity to the query text, in [0, 1]
    pub similarity: f32,
}

/// A reference pair to be stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub question: String,
    pub answer: String,
}

/// Vector index trait defining the operations the engine needs
///
/// `search` results are ordered by descending similarity.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Find the `top_k` reference pairs most similar to `text`
    async fn search(&self, text: &str, top_k: usize) -> Result<Vec<ReferenceHit>>;

    /// Store reference pairs; returns how many points were written
    async fn upsert(&self, documents: &[ReferenceDocument]) -> Result<usize>;
}
