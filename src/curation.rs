//! Reference knowledge-base curation
//!
//! Keeps the reference collection free of near duplicates as new
//! question/answer pairs are added. A candidate question is considered
//! already present when a stored question is sufficiently similar by
//! embedding, or when the two normalize to the same text.

use crate::config::CurationConfig;
use crate::error::Result;
use crate::index::{ReferenceDocument, ReferenceHit, VectorIndex};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one store-if-new attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CurationOutcome {
    /// The pair was novel and has been stored
    Stored,

    /// A sufficiently similar question already exists; nothing was stored
    SkippedSimilar {
        existing_question: String,
        similarity: f32,
    },

    /// The candidate question was empty after trimming
    RejectedEmpty,
}

/// Maintains the reference collection the retriever reads
pub struct ReferenceCurator {
    index: Arc<dyn VectorIndex>,
    config: CurationConfig,
}

impl ReferenceCurator {
    pub fn new(index: Arc<dyn VectorIndex>, config: CurationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { index, config })
    }

    /// Look for an already-stored question matching the candidate
    ///
    /// A hit counts as a match when its similarity clears the dedup
    /// threshold, or when its normalized text equals the candidate's
    /// normalized text (catches trivially rephrased punctuation/casing).
    pub async fn check_exists(&self, question: &str) -> Result<Option<ReferenceHit>> {
        let hits = self
            .index
            .search(question, self.config.dedup_top_k)
            .await?;

        for hit in &hits {
            if hit.similarity >= self.config.dedup_threshold {
                debug!(
                    "Found similar stored question (similarity {:.3})",
                    hit.similarity
                );
                return Ok(Some(hit.clone()));
            }
        }

        let normalized = normalize_question(question);
        for hit in hits {
            if normalize_question(&hit.question) == normalized {
                debug!("Found exact normalized match for candidate question");
                return Ok(Some(hit));
            }
        }

        Ok(None)
    }

    /// Store a question/answer pair unless an equivalent is already present
    pub async fn store_if_new(&self, question: &str, answer: &str) -> Result<CurationOutcome> {
        if question.trim().is_empty() {
            warn!("Refusing to store empty question");
            return Ok(CurationOutcome::RejectedEmpty);
        }

        // A failed duplicate check degrades to "not found": storing a
        // duplicate is recoverable, silently losing a new pair is not.
        let existing = match self.check_exists(question).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Duplicate check failed, storing anyway: {}", e);
                None
            }
        };

        if let Some(existing) = existing {
            info!(
                "Skipping storage: similar question exists (similarity {:.3})",
                existing.similarity
            );
            return Ok(CurationOutcome::SkippedSimilar {
                existing_question: existing.question,
                similarity: existing.similarity,
            });
        }

        let document = ReferenceDocument {
            question: question.trim().to_string(),
            answer: answer.trim().to_string(),
        };
        self.index.upsert(std::slice::from_ref(&document)).await?;

        info!("Stored new reference question");
        Ok(CurationOutcome::Stored)
    }
}

/// Normalize question text for comparison: lowercase, trim, and strip
/// trailing punctuation
fn normalize_question(question: &str) -> String {
    question
        .trim()
        .to_lowercase()
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}
