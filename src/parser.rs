//! Generative response parsing and validation
//!
//! The evaluator's output is a schema-less boundary: usually the requested
//! JSON, sometimes wrapped in prose or code fences, occasionally truncated
//! or missing fields. This module turns that raw text into a validated
//! structure or, when validation fails, into a degraded-but-well-formed
//! fallback. It never errors: every transcript always gets exactly one
//! assessment per entry, in order.
//!
//! Everything here is pure; parsing the same text twice yields identical
//! results.

use crate::prompt::REQUIRED_KEYS;
use crate::scoring;
use crate::types::{AnswerAssessment, DimensionScore, ReferencePair, TranscriptEntry};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Neutral score used where an assessment could not be salvaged
pub const NEUTRAL_SCORE: u8 = 50;

/// Validated output of one generative evaluation
#[derive(Debug, Clone)]
pub struct ParsedEvaluation {
    /// One assessment per transcript entry, in transcript order
    pub assessments: Vec<AnswerAssessment>,

    pub performance_summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub next_steps: Vec<String>,

    /// Proposed proficiency per skill; empty when degraded
    pub skill_level_assessment: BTreeMap<String, u8>,

    /// True when the raw output failed validation and this value was built
    /// by the fallback path
    pub degraded: bool,
}

/// Parse and validate a generative evaluation response
///
/// `references` must be aligned with `transcript` by index; reference
/// answers in the output come from retrieval, not from the model.
pub fn parse_evaluation(
    raw: &str,
    transcript: &[TranscriptEntry],
    references: &[Option<ReferencePair>],
) -> ParsedEvaluation {
    debug_assert_eq!(transcript.len(), references.len());

    let value = match extract_json(raw) {
        Some(value) => value,
        None => {
            warn!("No JSON block found in generative output; using fallback");
            return fallback_evaluation(None, transcript, references);
        }
    };

    match validate(&value, transcript, references) {
        Ok(parsed) => parsed,
        Err(reason) => {
            warn!("Generative output failed validation ({}); using fallback", reason);
            fallback_evaluation(Some(&value), transcript, references)
        }
    }
}

/// Locate and parse the structured block inside free-form model output
fn extract_json(raw: &str) -> Option<Value> {
    let text = strip_code_fences(raw);

    // Fast path: the whole remainder is the object we asked for.
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    // Otherwise scan for balanced top-level `{...}` blocks, skipping brace
    // characters inside string literals, and take the first block that
    // carries the expected keys.
    for candidate in balanced_blocks(text) {
        if !candidate.contains("overall_score") {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    None
}

/// Drop a leading/trailing markdown code fence if present
fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// All balanced top-level `{...}` substrings, in order of appearance
fn balanced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            blocks.push(&text[s..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    blocks
}

/// Strict structural validation against the transcript
fn validate(
    value: &Value,
    transcript: &[TranscriptEntry],
    references: &[Option<ReferencePair>],
) -> std::result::Result<ParsedEvaluation, String> {
    let object = value.as_object().ok_or("top level is not an object")?;

    for key in REQUIRED_KEYS {
        if !object.contains_key(*key) {
            return Err(format!("missing required key '{}'", key));
        }
    }

    score_in_range(&object["overall_score"], 0, 100)
        .ok_or("overall_score is not a number in [0, 100]")?;

    let summary = object["performance_summary"]
        .as_str()
        .ok_or("performance_summary is not a string")?
        .to_string();

    let raw_assessments = object["individual_answer_assessments"]
        .as_array()
        .ok_or("individual_answer_assessments is not an array")?;

    if raw_assessments.len() != transcript.len() {
        return Err(format!(
            "expected {} answer assessments, got {}",
            transcript.len(),
            raw_assessments.len()
        ));
    }

    let mut assessments = Vec::with_capacity(transcript.len());
    for (i, (entry, reference)) in transcript.iter().zip(references).enumerate() {
        let assessment = raw_assessments[i]
            .as_object()
            .ok_or_else(|| format!("assessment {} is not an object", i))?;

        let parse_dimension = |name: &str| -> std::result::Result<DimensionScore, String> {
            let dimension = assessment
                .get(name)
                .and_then(Value::as_object)
                .ok_or_else(|| format!("assessment {} is missing dimension '{}'", i, name))?;

            let score = dimension
                .get("score")
                .and_then(|s| score_in_range(s, 0, 100))
                .ok_or_else(|| {
                    format!("assessment {} dimension '{}' score invalid", i, name)
                })?;

            let feedback = dimension
                .get("feedback")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "No feedback provided".to_string());

            Ok(DimensionScore::new(score, feedback))
        };

        let accurateness = parse_dimension("accurateness")?;
        let confidence = parse_dimension("confidence")?;
        let completeness = parse_dimension("completeness")?;

        // Identity fields come from the transcript, the reference answer
        // from retrieval, and the weighted score is recomputed; the model
        // only contributes dimension scores and feedback text.
        let overall_answer_score = scoring::overall_answer_score(
            accurateness.score,
            confidence.score,
            completeness.score,
        );
        assessments.push(AnswerAssessment {
            question_number: entry.question_number,
            question: entry.question.clone(),
            user_answer: entry.answer.clone(),
            reference_answer: reference.as_ref().map(|r| r.answer.clone()),
            accurateness,
            confidence,
            completeness,
            overall_answer_score,
        });
    }

    let skills_object = object["skill_level_assessment"]
        .as_object()
        .ok_or("skill_level_assessment is not an object")?;

    let mut skill_level_assessment = BTreeMap::new();
    for (skill, level) in skills_object {
        let level = integer_in_range(level, 1, 5).ok_or_else(|| {
            format!("skill '{}' level is not an integer in 1..=5", skill)
        })?;
        skill_level_assessment.insert(skill.clone(), level);
    }

    debug!(
        "Validated generative output: {} assessments, {} skill proposals",
        assessments.len(),
        skill_level_assessment.len()
    );

    Ok(ParsedEvaluation {
        assessments,
        performance_summary: summary,
        strengths: string_list(object.get("strengths")),
        areas_for_improvement: string_list(object.get("areas_for_improvement")),
        next_steps: string_list(object.get("next_steps")),
        skill_level_assessment,
        degraded: false,
    })
}

/// Degraded result: salvage what is individually valid, neutral elsewhere
///
/// The fallback never proposes skill updates; a malformed response must not
/// move stored proficiency.
fn fallback_evaluation(
    value: Option<&Value>,
    transcript: &[TranscriptEntry],
    references: &[Option<ReferencePair>],
) -> ParsedEvaluation {
    let raw_assessments = value
        .and_then(|v| v.get("individual_answer_assessments"))
        .and_then(Value::as_array);

    let assessments = transcript
        .iter()
        .zip(references)
        .enumerate()
        .map(|(i, (entry, reference))| {
            let salvaged = raw_assessments
                .and_then(|list| list.get(i))
                .and_then(|a| salvage_dimensions(a));

            let (accurateness, confidence, completeness) = salvaged.unwrap_or_else(|| {
                (
                    DimensionScore::new(NEUTRAL_SCORE, "Unable to assess accurateness"),
                    DimensionScore::new(NEUTRAL_SCORE, "Unable to assess confidence"),
                    DimensionScore::new(NEUTRAL_SCORE, "Unable to assess completeness"),
                )
            });

            let overall_answer_score = scoring::overall_answer_score(
                accurateness.score,
                confidence.score,
                completeness.score,
            );
            AnswerAssessment {
                question_number: entry.question_number,
                question: entry.question.clone(),
                user_answer: entry.answer.clone(),
                reference_answer: reference.as_ref().map(|r| r.answer.clone()),
                accurateness,
                confidence,
                completeness,
                overall_answer_score,
            }
        })
        .collect();

    let summary = value
        .and_then(|v| v.get("performance_summary"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            "The evaluation response could not be fully processed. Scores shown are \
             neutral placeholders where per-answer detail was unavailable."
                .to_string()
        });

    ParsedEvaluation {
        assessments,
        performance_summary: summary,
        strengths: string_list(value.and_then(|v| v.get("strengths"))),
        areas_for_improvement: string_list(value.and_then(|v| v.get("areas_for_improvement"))),
        next_steps: string_list(value.and_then(|v| v.get("next_steps"))),
        skill_level_assessment: BTreeMap::new(),
        degraded: true,
    }
}

/// All three dimensions of one raw assessment, if individually valid
fn salvage_dimensions(
    assessment: &Value,
) -> Option<(DimensionScore, DimensionScore, DimensionScore)> {
    let get = |name: &str| -> Option<DimensionScore> {
        let dimension = assessment.get(name)?;
        let score = score_in_range(dimension.get("score")?, 0, 100)?;
        let feedback = dimension
            .get("feedback")
            .and_then(Value::as_str)
            .unwrap_or("No feedback provided")
            .to_string();
        Some(DimensionScore::new(score, feedback))
    };
    Some((get("accurateness")?, get("confidence")?, get("completeness")?))
}

/// Numeric value within [min, max], rounded to the nearest integer
fn score_in_range(value: &Value, min: u8, max: u8) -> Option<u8> {
    let number = value.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    let rounded = number.round();
    if rounded < f64::from(min) || rounded > f64::from(max) {
        return None;
    }
    Some(rounded as u8)
}

/// Integer value within [min, max]; fractional numbers are rejected
fn integer_in_range(value: &Value, min: u8, max: u8) -> Option<u8> {
    let number = value.as_f64()?;
    if !number.is_finite() || number.fract() != 0.0 {
        return None;
    }
    if number < f64::from(min) || number > f64::from(max) {
        return None;
    }
    Some(number as u8)
}

/// Best-effort string array extraction
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
