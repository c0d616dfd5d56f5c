//! Core data types for the Dokimi evaluation engine
//!
//! This module defines the data structures that flow through an evaluation
//! call: the interview transcript, retrieved reference pairs, per-answer
//! assessments, and the final evaluation result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Weight of the accurateness dimension in a per-answer score
pub const ACCURATENESS_WEIGHT: f64 = 0.40;

/// Weight of the confidence dimension in a per-answer score
pub const CONFIDENCE_WEIGHT: f64 = 0.30;

/// Weight of the completeness dimension in a per-answer score
pub const COMPLETENESS_WEIGHT: f64 = 0.30;

/// Lowest valid skill proficiency level
pub const MIN_SKILL_LEVEL: u8 = 1;

/// Highest valid skill proficiency level
pub const MAX_SKILL_LEVEL: u8 = 5;

/// Unique identifier for users
///
/// Wraps a UUID to provide type safety and prevent mixing user identities
/// with other UUID-based identifiers in the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new random user ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One question/answer exchange from an interview
///
/// Entries are owned by the caller for the duration of one evaluation call
/// and are read-only to the engine. Insertion order is significant: question
/// numbering in outputs follows transcript order exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// 1-based question number, stable across the whole pipeline
    pub question_number: u32,

    /// The interview question as asked (must be non-empty)
    pub question: String,

    /// The candidate's answer (may be empty if no answer was given)
    pub answer: String,
}

impl TranscriptEntry {
    pub fn new(question_number: u32, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_number,
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Optional interview metadata woven into the evaluation prompt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterviewContext {
    /// Company the candidate interviewed with
    pub company: Option<String>,

    /// Position the candidate interviewed for
    pub role: Option<String>,

    /// Candidate display name
    pub candidate_name: Option<String>,

    /// Skills the interview was meant to assess
    pub skills: Vec<String>,
}

/// A complete evaluation request: the transcript plus optional context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Ordered interview exchanges (must be non-empty)
    pub transcript: Vec<TranscriptEntry>,

    /// Interview metadata, when the caller has it
    #[serde(default)]
    pub context: Option<InterviewContext>,
}

impl EvaluationRequest {
    pub fn new(transcript: Vec<TranscriptEntry>) -> Self {
        Self {
            transcript,
            context: None,
        }
    }

    pub fn with_context(transcript: Vec<TranscriptEntry>, context: InterviewContext) -> Self {
        Self {
            transcript,
            context: Some(context),
        }
    }
}

/// A known-good question/answer pair retrieved from the knowledge base
///
/// Ephemeral: produced per transcript entry during one evaluation call and
/// used as the grading anchor for that entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePair {
    /// The reference question matched against the interview question
    pub question: String,

    /// The expected answer from the knowledge base
    pub answer: String,

    /// Cosine similarity between interview and reference question, in [0, 1]
    pub similarity: f32,
}

/// A user's current proficiency levels, skill name -> level in 1..=5
///
/// Keys are case-sensitive and free-form. Read from the skill store at the
/// start of an evaluation and used as prompt context only; never mutated in
/// place.
pub type SkillSnapshot = BTreeMap<String, u8>;

/// Score and feedback for one assessment dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    /// Dimension score in 0..=100
    pub score: u8,

    /// Dimension-specific feedback text
    pub feedback: String,
}

impl DimensionScore {
    pub fn new(score: u8, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }
}

/// Assessment of a single answer across the three grading dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerAssessment {
    /// Question number, matching the transcript entry exactly
    pub question_number: u32,

    /// The interview question
    pub question: String,

    /// The candidate's answer
    pub user_answer: String,

    /// Reference answer used as the grading anchor, if one was matched
    pub reference_answer: Option<String>,

    /// Technical correctness relative to the reference answer
    pub accurateness: DimensionScore,

    /// Assertiveness, structure, and clarity of delivery
    pub confidence: DimensionScore,

    /// Coverage of the essential points from the reference answer
    pub completeness: DimensionScore,

    /// Weighted score for this answer: round(0.40*acc + 0.30*conf + 0.30*comp)
    pub overall_answer_score: u8,
}

/// Coverage of the reference knowledge base across the transcript
///
/// Distinguishes "no entry had a usable reference" from "references matched
/// with zero similarity"; the two must not be conflated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "score")]
pub enum ReferenceCoverage {
    /// No transcript entry had a matched reference pair
    NoReferenceData,

    /// Mean similarity over entries with a reference, scaled to 0..=100
    Measured(u8),
}

impl ReferenceCoverage {
    /// Numeric coverage score; 0 when no reference data was available
    pub fn score(&self) -> u8 {
        match self {
            ReferenceCoverage::NoReferenceData => 0,
            ReferenceCoverage::Measured(score) => *score,
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self, ReferenceCoverage::Measured(_))
    }
}

/// One applied conservative skill update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDelta {
    /// Skill name as assessed
    pub skill: String,

    /// Stored level before this evaluation, if the skill was known
    pub previous: Option<u8>,

    /// Level the assessment proposed
    pub proposed: u8,

    /// Level actually stored after conservative clamping
    pub stored: u8,
}

/// Complete result of one evaluation call
///
/// Immutable after construction. The engine does not persist this value;
/// only the skill deltas are written through the skill store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Overall interview score in 0..=100: rounded mean of per-answer scores
    pub overall_score: u8,

    /// Natural-language overall assessment
    pub performance_summary: String,

    /// One assessment per transcript entry, in transcript order
    #[serde(rename = "individual_answer_assessments")]
    pub answer_assessments: Vec<AnswerAssessment>,

    /// Similarity-weighted coverage of the reference knowledge base
    pub reference_coverage: ReferenceCoverage,

    /// Specific strengths observed in the answers
    pub strengths: Vec<String>,

    /// Specific gaps relative to the reference answers
    pub areas_for_improvement: Vec<String>,

    /// Recommended follow-up actions
    pub next_steps: Vec<String>,

    /// Proposed proficiency per skill, before conservative clamping
    pub skill_level_assessment: BTreeMap<String, u8>,

    /// Skill updates actually applied to the store
    pub skill_deltas: Vec<SkillDelta>,

    /// Secondary failures that did not invalidate the result
    pub warnings: Vec<String>,

    /// True when the generative output failed validation and this result
    /// was built by the fallback path
    pub degraded: bool,

    /// When this evaluation completed
    pub evaluated_at: DateTime<Utc>,
}
