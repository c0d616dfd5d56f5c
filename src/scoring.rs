//! Numeric score aggregation
//!
//! Pure functions over dimension scores and retrieval similarities. All
//! rounding is half away from zero (`f64::round`), so `[90, 70, 50]`
//! averages to exactly 70.

use crate::types::{
    AnswerAssessment, ReferenceCoverage, ReferencePair, ACCURATENESS_WEIGHT, COMPLETENESS_WEIGHT,
    CONFIDENCE_WEIGHT,
};

/// Weighted score for one answer from its three dimension scores
///
/// Invariant: `overall = round(0.40*accurateness + 0.30*confidence +
/// 0.30*completeness)` for every assessment the engine emits.
pub fn overall_answer_score(accurateness: u8, confidence: u8, completeness: u8) -> u8 {
    let weighted = ACCURATENESS_WEIGHT * f64::from(accurateness)
        + CONFIDENCE_WEIGHT * f64::from(confidence)
        + COMPLETENESS_WEIGHT * f64::from(completeness);
    weighted.round() as u8
}

/// Overall interview score: rounded arithmetic mean of per-answer scores
///
/// Callers must not pass an empty slice; an empty transcript is refused
/// before aggregation is ever reached.
pub fn overall_score(assessments: &[AnswerAssessment]) -> u8 {
    debug_assert!(!assessments.is_empty(), "aggregation over empty transcript");
    if assessments.is_empty() {
        return 0;
    }
    let sum: u32 = assessments
        .iter()
        .map(|a| u32::from(a.overall_answer_score))
        .sum();
    (f64::from(sum) / assessments.len() as f64).round() as u8
}

/// Coverage of the reference knowledge base across the transcript
///
/// Entries with no matched reference are excluded from the mean, not
/// counted as zero. When nothing matched, the result is the explicit
/// no-data marker rather than a zero score.
pub fn reference_coverage(references: &[Option<ReferencePair>]) -> ReferenceCoverage {
    let similarities: Vec<f32> = references
        .iter()
        .flatten()
        .map(|reference| reference.similarity)
        .collect();

    if similarities.is_empty() {
        return ReferenceCoverage::NoReferenceData;
    }

    let mean = similarities.iter().sum::<f32>() / similarities.len() as f32;
    ReferenceCoverage::Measured((f64::from(mean) * 100.0).round().clamp(0.0, 100.0) as u8)
}
