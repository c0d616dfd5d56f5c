//! Reference context retrieval
//!
//! For each interview question, finds the best-matching reference pair in
//! the vector index, or reports that none is usable. Failures are isolated
//! per question: an unreachable index degrades that question to
//! "no reference" instead of aborting the evaluation.

use crate::index::VectorIndex;
use crate::types::{ReferencePair, TranscriptEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Retrieves grading anchors from the reference knowledge base
pub struct ReferenceRetriever {
    index: Arc<dyn VectorIndex>,
    similarity_threshold: f32,
    top_k: usize,
}

impl ReferenceRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, similarity_threshold: f32, top_k: usize) -> Self {
        Self {
            index,
            similarity_threshold,
            top_k,
        }
    }

    /// Best usable reference for one question, or None
    ///
    /// Queries the index for the top candidates and keeps the highest-scored
    /// one iff it clears the usability threshold. Index errors are logged
    /// and degrade to None.
    pub async fn retrieve(&self, question: &str) -> Option<ReferencePair> {
        Self::retrieve_one(
            Arc::clone(&self.index),
            question,
            self.similarity_threshold,
            self.top_k,
        )
        .await
    }

    async fn retrieve_one(
        index: Arc<dyn VectorIndex>,
        question: &str,
        threshold: f32,
        top_k: usize,
    ) -> Option<ReferencePair> {
        let hits = match index.search(question, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Reference retrieval unavailable for question: {}", e);
                return None;
            }
        };

        let best = hits
            .into_iter()
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity))?;

        if best.similarity < threshold {
            debug!(
                "Best reference below usability threshold ({:.2} < {:.2})",
                best.similarity, threshold
            );
            return None;
        }

        Some(ReferencePair {
            question: best.question,
            answer: best.answer,
            similarity: best.similarity,
        })
    }

    /// Retrieve references for a whole transcript, in transcript order
    ///
    /// Identical question texts are queried once per call. The per-question
    /// lookups are independent, so they fan out concurrently and are joined
    /// back into an arena indexed by the unique-question position; ordering
    /// never depends on task completion order.
    pub async fn retrieve_all(&self, transcript: &[TranscriptEntry]) -> Vec<Option<ReferencePair>> {
        let mut unique_questions: Vec<String> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        for entry in transcript {
            if !position.contains_key(entry.question.as_str()) {
                position.insert(entry.question.as_str(), unique_questions.len());
                unique_questions.push(entry.question.clone());
            }
        }

        debug!(
            "Retrieving references for {} questions ({} unique)",
            transcript.len(),
            unique_questions.len()
        );

        let mut tasks = JoinSet::new();
        for (idx, question) in unique_questions.iter().enumerate() {
            let index = Arc::clone(&self.index);
            let question = question.clone();
            let threshold = self.similarity_threshold;
            let top_k = self.top_k;
            tasks.spawn(async move {
                (
                    idx,
                    Self::retrieve_one(index, &question, threshold, top_k).await,
                )
            });
        }

        let mut arena: Vec<Option<ReferencePair>> = vec![None; unique_questions.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, reference)) => arena[idx] = reference,
                Err(e) => warn!("Retrieval task failed: {}", e),
            }
        }

        transcript
            .iter()
            .map(|entry| {
                position
                    .get(entry.question.as_str())
                    .and_then(|&idx| arena[idx].clone())
            })
            .collect()
    }
}
