//! Assessment metrics and human-readable summaries
//!
//! Derived views over a finished evaluation: per-dimension averages for
//! display, performance banding, and a one-line digest.

use crate::types::{AnswerAssessment, EvaluationResult};
use serde::{Deserialize, Serialize};

/// Mean score per grading dimension across all answers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionAverages {
    pub accurateness: f64,
    pub confidence: f64,
    pub completeness: f64,
}

/// Average each dimension over the answer assessments, one-decimal rounding
///
/// Returns None for an empty slice rather than inventing zeros.
pub fn assessment_averages(assessments: &[AnswerAssessment]) -> Option<DimensionAverages> {
    if assessments.is_empty() {
        return None;
    }

    let n = assessments.len() as f64;
    let sum = |get: fn(&AnswerAssessment) -> u8| -> f64 {
        assessments.iter().map(|a| f64::from(get(a))).sum::<f64>()
    };

    Some(DimensionAverages {
        accurateness: round_one_decimal(sum(|a| a.accurateness.score) / n),
        confidence: round_one_decimal(sum(|a| a.confidence.score) / n),
        completeness: round_one_decimal(sum(|a| a.completeness.score) / n),
    })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Performance band over the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
    Poor,
}

impl PerformanceLevel {
    /// Band an overall score: >=90, >=80, >=70, >=60, below
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=255 => PerformanceLevel::Excellent,
            80..=89 => PerformanceLevel::Good,
            70..=79 => PerformanceLevel::Satisfactory,
            60..=69 => PerformanceLevel::NeedsImprovement,
            _ => PerformanceLevel::Poor,
        }
    }
}

impl std::fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PerformanceLevel::Excellent => "Excellent",
            PerformanceLevel::Good => "Good",
            PerformanceLevel::Satisfactory => "Satisfactory",
            PerformanceLevel::NeedsImprovement => "Needs Improvement",
            PerformanceLevel::Poor => "Poor",
        };
        write!(f, "{}", label)
    }
}

/// One-line human-readable digest of an evaluation
pub fn summary_line(result: &EvaluationResult) -> String {
    let level = PerformanceLevel::from_score(result.overall_score);

    let mut summary = format!(
        "Overall Performance: {} (Score: {}/100). ",
        level, result.overall_score
    );

    if result.reference_coverage.has_data() {
        summary.push_str(&format!(
            "Reference Knowledge Coverage: {}%. ",
            result.reference_coverage.score()
        ));
    } else {
        summary.push_str("No reference data was available for this interview. ");
    }

    if let Some(strength) = result.strengths.first() {
        summary.push_str(&format!("Key Strength: {}. ", strength));
    }
    if let Some(improvement) = result.areas_for_improvement.first() {
        summary.push_str(&format!("Priority Improvement: {}.", improvement));
    }

    summary.trim_end().to_string()
}
