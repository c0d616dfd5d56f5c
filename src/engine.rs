//! Evaluation engine
//!
//! Orchestrates one evaluation call: validate the transcript, retrieve
//! reference answers, build the prompt, make the single generative call,
//! parse and aggregate, then apply conservative skill updates. Each call is
//! a pure function of its inputs plus the three collaborators; no state is
//! shared between calls.

use crate::config::EngineConfig;
use crate::error::{EvaluationError, Result};
use crate::index::VectorIndex;
use crate::parser;
use crate::prompt::PromptBuilder;
use crate::retrieval::ReferenceRetriever;
use crate::scoring;
use crate::services::GenerativeEvaluator;
use crate::skills::SkillLevelUpdater;
use crate::storage::SkillStore;
use crate::types::{EvaluationRequest, EvaluationResult, SkillSnapshot, TranscriptEntry, UserId};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Reference-grounded interview evaluation engine
pub struct EvaluationEngine {
    retriever: ReferenceRetriever,
    evaluator: Arc<dyn GenerativeEvaluator>,
    updater: SkillLevelUpdater,
    store: Arc<dyn SkillStore>,
    config: EngineConfig,
}

impl EvaluationEngine {
    /// Create an engine over the three collaborator services
    pub fn new(
        index: Arc<dyn VectorIndex>,
        evaluator: Arc<dyn GenerativeEvaluator>,
        store: Arc<dyn SkillStore>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let retriever = ReferenceRetriever::new(
            index,
            config.similarity_threshold,
            config.retrieval_top_k,
        );
        let updater = SkillLevelUpdater::new(Arc::clone(&store));

        Ok(Self {
            retriever,
            evaluator,
            updater,
            store,
            config,
        })
    }

    /// Evaluate one interview transcript for a user
    ///
    /// Hard failures: an empty or malformed transcript, and a failed or
    /// timed-out generative call. Retrieval trouble degrades per question;
    /// malformed generative output degrades to a fallback result; skill
    /// persistence failures become warnings on the result.
    pub async fn evaluate(
        &self,
        user: UserId,
        request: &EvaluationRequest,
        snapshot: &SkillSnapshot,
    ) -> Result<EvaluationResult> {
        validate_transcript(&request.transcript)?;

        info!(
            "Evaluating transcript of {} answers for user {}",
            request.transcript.len(),
            user
        );

        let references = self.retriever.retrieve_all(&request.transcript).await;
        let matched = references.iter().flatten().count();
        debug!(
            "Matched references for {}/{} questions",
            matched,
            references.len()
        );

        let prompt = PromptBuilder::build(
            &request.transcript,
            &references,
            snapshot,
            request.context.as_ref(),
        );

        let raw = self.generate_bounded(&prompt).await?;

        let parsed = parser::parse_evaluation(&raw, &request.transcript, &references);
        if parsed.degraded {
            warn!("Generative output was malformed; returning fallback result");
        }

        let overall_score = scoring::overall_score(&parsed.assessments);
        let reference_coverage = scoring::reference_coverage(&references);

        // A degraded parse never proposes skill movements, so this is a
        // no-op walk over an empty map on the fallback path.
        let (skill_deltas, warnings) = self
            .updater
            .apply(user, &parsed.skill_level_assessment, snapshot)
            .await;

        info!(
            "Evaluation complete: overall {}, {} skill updates, {} warnings",
            overall_score,
            skill_deltas.len(),
            warnings.len()
        );

        Ok(EvaluationResult {
            overall_score,
            performance_summary: parsed.performance_summary,
            answer_assessments: parsed.assessments,
            reference_coverage,
            strengths: parsed.strengths,
            areas_for_improvement: parsed.areas_for_improvement,
            next_steps: parsed.next_steps,
            skill_level_assessment: parsed.skill_level_assessment,
            skill_deltas,
            warnings,
            degraded: parsed.degraded,
            evaluated_at: Utc::now(),
        })
    }

    /// Evaluate using the user's stored skill snapshot
    pub async fn evaluate_stored(
        &self,
        user: UserId,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult> {
        let snapshot = self.store.get_skills(user).await.unwrap_or_else(|e| {
            warn!("Could not load skill snapshot, proceeding without priors: {}", e);
            BTreeMap::new()
        });
        self.evaluate(user, request, &snapshot).await
    }

    /// One generative attempt with a hard upper bound on latency
    async fn generate_bounded(&self, prompt: &str) -> Result<String> {
        let limit = Duration::from_secs(self.config.generation_timeout_secs);

        match timeout(limit, self.evaluator.generate(prompt)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(EvaluationError::Generation(
                "Model returned empty text".to_string(),
            )),
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(EvaluationError::Generation(e.to_string())),
            Err(_) => Err(EvaluationError::Generation(format!(
                "Timed out after {}s",
                self.config.generation_timeout_secs
            ))),
        }
    }
}

/// Enforce the transcript input contract before any external call
fn validate_transcript(transcript: &[TranscriptEntry]) -> Result<()> {
    if transcript.is_empty() {
        return Err(EvaluationError::EmptyTranscript);
    }

    for (i, entry) in transcript.iter().enumerate() {
        if entry.question.trim().is_empty() {
            return Err(EvaluationError::InvalidTranscript(format!(
                "Entry {} has an empty question",
                i
            )));
        }
        if entry.question_number == 0 {
            return Err(EvaluationError::InvalidTranscript(format!(
                "Entry {} has question number 0; numbering is 1-based",
                i
            )));
        }
    }

    Ok(())
}
