//! Evaluation prompt construction
//!
//! Assembles the single structured request sent to the generative
//! evaluator: the numbered transcript, retrieved reference answers, the
//! user's current skill levels as priors, and the exact output contract the
//! parser validates against.

use crate::types::{InterviewContext, ReferencePair, SkillSnapshot, TranscriptEntry};

/// Top-level keys the model must emit; the parser checks the same list
pub const REQUIRED_KEYS: &[&str] = &[
    "overall_score",
    "performance_summary",
    "individual_answer_assessments",
    "strengths",
    "areas_for_improvement",
    "next_steps",
    "skill_level_assessment",
];

/// Role framing and grading dimensions for the evaluator
const EVALUATION_INSTRUCTIONS: &str = r#"You are an expert technical interviewer and career coach. Evaluate the interview performance below, comparing each answer against the reference answer from the knowledge base where one is provided.

Assess every answer on exactly three dimensions:
1. Accurateness (weight 40%): how closely the answer matches the reference answer in technical correctness. High scores for matching key concepts, low scores for factual errors.
2. Confidence (weight 30%): how assertive, structured, and clear the delivery is. Look for assertive language, clear explanations, logical flow.
3. Completeness (weight 30%): whether the answer covers the essential points of the reference answer. Partial coverage gets medium scores.

For a question marked "no reference available", grade primarily on completeness, confidence, and the plausibility of the answer; never skip such a question."#;

/// Output contract; kept in lockstep with the parser's validation
const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object of exactly this shape:

{
    "overall_score": <integer 0-100>,
    "performance_summary": "<2-3 sentence overall assessment>",
    "individual_answer_assessments": [
        {
            "question_number": <integer, matching the transcript>,
            "question": "<the interview question>",
            "user_answer": "<the candidate's answer>",
            "reference_answer": "<reference answer, or null if none was available>",
            "accurateness": {"score": <integer 0-100>, "feedback": "<specific assessment>"},
            "confidence": {"score": <integer 0-100>, "feedback": "<specific assessment>"},
            "completeness": {"score": <integer 0-100>, "feedback": "<specific assessment>"},
            "overall_answer_score": <integer 0-100>
        }
    ],
    "strengths": ["<specific strength>", ...],
    "areas_for_improvement": ["<specific gap versus the reference answers>", ...],
    "next_steps": ["<actionable recommendation>", ...],
    "skill_level_assessment": {"<skill name>": <integer 1-5>, ...}
}

Include one entry in individual_answer_assessments per transcript question, in transcript order.
Return ONLY the JSON object, no additional text."#;

/// Builds the structured evaluation request
pub struct PromptBuilder;

impl PromptBuilder {
    /// Assemble the full prompt for one evaluation call
    ///
    /// `references` must be aligned with `transcript` by index. Every
    /// transcript entry is included; entries without a reference are
    /// explicitly marked rather than dropped.
    pub fn build(
        transcript: &[TranscriptEntry],
        references: &[Option<ReferencePair>],
        snapshot: &SkillSnapshot,
        context: Option<&InterviewContext>,
    ) -> String {
        debug_assert_eq!(transcript.len(), references.len());

        let mut prompt = String::new();
        prompt.push_str(EVALUATION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        if let Some(context) = context {
            prompt.push_str("INTERVIEW CONTEXT:\n");
            if let Some(company) = &context.company {
                prompt.push_str(&format!("- Company: {}\n", company));
            }
            if let Some(role) = &context.role {
                prompt.push_str(&format!("- Position: {}\n", role));
            }
            if let Some(name) = &context.candidate_name {
                prompt.push_str(&format!("- Candidate: {}\n", name));
            }
            if !context.skills.is_empty() {
                prompt.push_str(&format!(
                    "- Skills assessed: {}\n",
                    context.skills.join(", ")
                ));
            }
            prompt.push('\n');
        }

        prompt.push_str("TRANSCRIPT WITH REFERENCE ANSWERS:\n");
        for (entry, reference) in transcript.iter().zip(references) {
            prompt.push_str(&format!("\nQ{}: {}\n", entry.question_number, entry.question));
            if entry.answer.trim().is_empty() {
                prompt.push_str("Candidate answer: (no answer given)\n");
            } else {
                prompt.push_str(&format!("Candidate answer: {}\n", entry.answer));
            }
            match reference {
                Some(reference) => {
                    prompt.push_str(&format!("Reference answer: {}\n", reference.answer));
                    prompt.push_str(&format!(
                        "Reference similarity: {:.2}\n",
                        reference.similarity
                    ));
                }
                None => prompt.push_str("Reference answer: no reference available\n"),
            }
        }

        prompt.push_str("\nCURRENT SKILL LEVELS (1-5):\n");
        if snapshot.is_empty() {
            prompt.push_str("No prior skill levels recorded for this candidate.\n");
        } else {
            for (skill, level) in snapshot {
                prompt.push_str(&format!("- {}: {}\n", skill, level));
            }
        }
        prompt.push_str(
            "Treat these levels as priors. Proposed levels in skill_level_assessment \
             should be conservative: a level should rarely move more than one step \
             from its current value in a single evaluation.\n\n",
        );

        prompt.push_str(OUTPUT_CONTRACT);
        prompt
    }
}
