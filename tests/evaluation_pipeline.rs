//! End-to-end tests for the evaluation pipeline over fake collaborators

use async_trait::async_trait;
use dokimi::config::EngineConfig;
use dokimi::error::{EvaluationError, Result};
use dokimi::index::{ReferenceDocument, ReferenceHit, VectorIndex};
use dokimi::services::GenerativeEvaluator;
use dokimi::storage::{SkillStore, SqliteSkillStore};
use dokimi::types::ReferenceCoverage;
use dokimi::{EvaluationEngine, EvaluationRequest, SkillSnapshot, TranscriptEntry, UserId};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Route engine logs through the test harness; RUST_LOG controls verbosity
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Index that serves canned hits keyed by question text
struct FakeIndex {
    hits: HashMap<String, Vec<ReferenceHit>>,
    fail: bool,
    queries: AtomicUsize,
}

impl FakeIndex {
    fn new() -> Self {
        Self {
            hits: HashMap::new(),
            fail: false,
            queries: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            hits: HashMap::new(),
            fail: true,
            queries: AtomicUsize::new(0),
        }
    }

    fn with_hit(mut self, question: &str, reference_answer: &str, similarity: f32) -> Self {
        self.hits.insert(
            question.to_string(),
            vec![ReferenceHit {
                question: format!("reference form of: {}", question),
                answer: reference_answer.to_string(),
                similarity,
            }],
        );
        self
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn search(&self, text: &str, _top_k: usize) -> Result<Vec<ReferenceHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EvaluationError::Retrieval("index down".to_string()));
        }
        Ok(self.hits.get(text).cloned().unwrap_or_default())
    }

    async fn upsert(&self, _documents: &[ReferenceDocument]) -> Result<usize> {
        Ok(0)
    }
}

/// Evaluator that returns a canned response (or fails, or stalls)
enum FakeEvaluator {
    Fixed(String),
    Failing,
    Empty,
    Stalling,
}

#[async_trait]
impl GenerativeEvaluator for FakeEvaluator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        match self {
            FakeEvaluator::Fixed(text) => Ok(text.clone()),
            FakeEvaluator::Failing => Err(EvaluationError::Generation(
                "service unavailable".to_string(),
            )),
            FakeEvaluator::Empty => Ok("   \n".to_string()),
            FakeEvaluator::Stalling => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
        }
    }
}

/// Store that records writes and can be told to fail them
struct RecordingStore {
    levels: Mutex<SkillSnapshot>,
    fail_writes: bool,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            levels: Mutex::new(SkillSnapshot::new()),
            fail_writes: false,
        }
    }

    fn failing_writes() -> Self {
        Self {
            levels: Mutex::new(SkillSnapshot::new()),
            fail_writes: true,
        }
    }

    fn written(&self) -> SkillSnapshot {
        self.levels.lock().unwrap().clone()
    }
}

#[async_trait]
impl SkillStore for RecordingStore {
    async fn get_skills(&self, _user: UserId) -> Result<SkillSnapshot> {
        Ok(self.levels.lock().unwrap().clone())
    }

    async fn upsert_skill(&self, _user: UserId, skill: &str, level: u8) -> Result<()> {
        if self.fail_writes {
            return Err(EvaluationError::SkillStore("disk full".to_string()));
        }
        self.levels
            .lock()
            .unwrap()
            .insert(skill.to_string(), level);
        Ok(())
    }
}

fn transcript() -> Vec<TranscriptEntry> {
    vec![
        TranscriptEntry::new(1, "What is a Python decorator?", "A function wrapper"),
        TranscriptEntry::new(2, "Explain database indexing", "B-trees speed up lookups"),
        TranscriptEntry::new(3, "What is Docker?", ""),
    ]
}

/// A valid model response aligned with `transcript()`
fn valid_response() -> String {
    let assessment = |n: u32, q: &str, a: &str, acc: u8, conf: u8, comp: u8| {
        json!({
            "question_number": n,
            "question": q,
            "user_answer": a,
            "reference_answer": null,
            "accurateness": {"score": acc, "feedback": "accuracy feedback"},
            "confidence": {"score": conf, "feedback": "confidence feedback"},
            "completeness": {"score": comp, "feedback": "completeness feedback"},
            "overall_answer_score": 0
        })
    };

    json!({
        "overall_score": 75,
        "performance_summary": "Competent answers with room for depth.",
        "individual_answer_assessments": [
            assessment(1, "What is a Python decorator?", "A function wrapper", 90, 90, 90),
            assessment(2, "Explain database indexing", "B-trees speed up lookups", 70, 70, 70),
            assessment(3, "What is Docker?", "", 50, 50, 50),
        ],
        "strengths": ["Concise definitions"],
        "areas_for_improvement": ["Expand on trade-offs"],
        "next_steps": ["Review container basics"],
        "skill_level_assessment": {"Python": 5, "Databases": 3, "Docker": 1}
    })
    .to_string()
}

fn engine(
    index: Arc<dyn VectorIndex>,
    evaluator: Arc<dyn GenerativeEvaluator>,
    store: Arc<dyn SkillStore>,
) -> EvaluationEngine {
    engine_with_timeout(index, evaluator, store, 60)
}

fn engine_with_timeout(
    index: Arc<dyn VectorIndex>,
    evaluator: Arc<dyn GenerativeEvaluator>,
    store: Arc<dyn SkillStore>,
    timeout_secs: u64,
) -> EvaluationEngine {
    let config = EngineConfig {
        similarity_threshold: 0.5,
        retrieval_top_k: 3,
        generation_timeout_secs: timeout_secs,
    };
    EvaluationEngine::new(index, evaluator, store, config).unwrap()
}

#[tokio::test]
async fn happy_path_produces_full_result() {
    init_tracing();
    let index = Arc::new(
        FakeIndex::new()
            .with_hit("What is a Python decorator?", "Wraps callables", 0.8)
            .with_hit("Explain database indexing", "B-tree structures", 0.6),
    );
    let evaluator = Arc::new(FakeEvaluator::Fixed(valid_response()));
    let store = Arc::new(RecordingStore::new());

    let engine = engine(index, evaluator, Arc::clone(&store) as Arc<dyn SkillStore>);

    let mut snapshot = SkillSnapshot::new();
    snapshot.insert("Python".to_string(), 2);

    let result = engine
        .evaluate(UserId::new(), &EvaluationRequest::new(transcript()), &snapshot)
        .await
        .unwrap();

    assert!(!result.degraded);
    assert_eq!(result.answer_assessments.len(), 3);
    // Question numbering follows the transcript
    let numbers: Vec<u32> = result
        .answer_assessments
        .iter()
        .map(|a| a.question_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    // Per-answer scores are the recomputed weighted sums: 90, 70, 50
    let scores: Vec<u8> = result
        .answer_assessments
        .iter()
        .map(|a| a.overall_answer_score)
        .collect();
    assert_eq!(scores, vec![90, 70, 50]);
    // Overall is their rounded mean
    assert_eq!(result.overall_score, 70);

    // Coverage from the two matched references: (0.8 + 0.6) / 2 -> 70
    assert_eq!(result.reference_coverage, ReferenceCoverage::Measured(70));

    // Reference answers come from retrieval, not the model
    assert_eq!(
        result.answer_assessments[0].reference_answer.as_deref(),
        Some("Wraps callables")
    );
    assert_eq!(result.answer_assessments[2].reference_answer, None);

    // Conservative skill updates: Python 2 -> proposed 5 -> stored 3;
    // new skills stored at their proposed level
    let written = store.written();
    assert_eq!(written.get("Python"), Some(&3));
    assert_eq!(written.get("Databases"), Some(&3));
    assert_eq!(written.get("Docker"), Some(&1));

    let python_delta = result
        .skill_deltas
        .iter()
        .find(|d| d.skill == "Python")
        .unwrap();
    assert_eq!(python_delta.previous, Some(2));
    assert_eq!(python_delta.proposed, 5);
    assert_eq!(python_delta.stored, 3);

    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn malformed_output_degrades_without_store_writes() {
    init_tracing();
    let index = Arc::new(FakeIndex::new());
    let evaluator = Arc::new(FakeEvaluator::Fixed(
        "Sorry, here is a partial answer: {\"overall_score\": 80,".to_string(),
    ));
    let store = Arc::new(RecordingStore::new());

    let engine = engine(index, evaluator, Arc::clone(&store) as Arc<dyn SkillStore>);

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(transcript()),
            &SkillSnapshot::new(),
        )
        .await
        .unwrap();

    assert!(result.degraded);
    assert_eq!(result.answer_assessments.len(), 3);
    assert!(result.skill_level_assessment.is_empty());
    assert!(result.skill_deltas.is_empty());
    assert!(store.written().is_empty());
    // Neutral scores average to the neutral value
    assert_eq!(result.overall_score, 50);
}

#[tokio::test]
async fn generation_failure_is_a_hard_error() {
    let engine = engine(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEvaluator::Failing),
        Arc::new(RecordingStore::new()),
    );

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(transcript()),
            &SkillSnapshot::new(),
        )
        .await;

    assert!(matches!(result, Err(EvaluationError::Generation(_))));
}

#[tokio::test]
async fn empty_generation_is_a_hard_error() {
    let engine = engine(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEvaluator::Empty),
        Arc::new(RecordingStore::new()),
    );

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(transcript()),
            &SkillSnapshot::new(),
        )
        .await;

    assert!(matches!(result, Err(EvaluationError::Generation(_))));
}

#[tokio::test]
async fn generation_timeout_is_a_hard_error() {
    let engine = engine_with_timeout(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEvaluator::Stalling),
        Arc::new(RecordingStore::new()),
        1,
    );

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(transcript()),
            &SkillSnapshot::new(),
        )
        .await;

    assert!(matches!(result, Err(EvaluationError::Generation(_))));
}

#[tokio::test]
async fn empty_transcript_is_refused() {
    let engine = engine(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEvaluator::Fixed(valid_response())),
        Arc::new(RecordingStore::new()),
    );

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(vec![]),
            &SkillSnapshot::new(),
        )
        .await;

    assert!(matches!(result, Err(EvaluationError::EmptyTranscript)));
}

#[tokio::test]
async fn unreachable_index_degrades_to_no_reference() {
    let evaluator = Arc::new(FakeEvaluator::Fixed(valid_response()));
    let engine = engine(
        Arc::new(FakeIndex::failing()),
        evaluator,
        Arc::new(RecordingStore::new()),
    );

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(transcript()),
            &SkillSnapshot::new(),
        )
        .await
        .unwrap();

    assert!(!result.degraded);
    assert_eq!(result.reference_coverage, ReferenceCoverage::NoReferenceData);
    assert!(result
        .answer_assessments
        .iter()
        .all(|a| a.reference_answer.is_none()));
}

#[tokio::test]
async fn skill_persistence_failure_becomes_warning() {
    let engine = engine(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEvaluator::Fixed(valid_response())),
        Arc::new(RecordingStore::failing_writes()),
    );

    let result = engine
        .evaluate(
            UserId::new(),
            &EvaluationRequest::new(transcript()),
            &SkillSnapshot::new(),
        )
        .await
        .unwrap();

    // The assessments themselves are intact
    assert!(!result.degraded);
    assert_eq!(result.answer_assessments.len(), 3);
    assert_eq!(result.warnings.len(), 3);
    assert!(result.skill_deltas.is_empty());
}

#[tokio::test]
async fn duplicate_questions_query_index_once() {
    let index = Arc::new(FakeIndex::new().with_hit("Same question", "Same answer", 0.9));
    let evaluator_response = {
        let assessment = |n: u32| {
            json!({
                "question_number": n,
                "question": "Same question",
                "user_answer": "answer",
                "reference_answer": null,
                "accurateness": {"score": 60, "feedback": "f"},
                "confidence": {"score": 60, "feedback": "f"},
                "completeness": {"score": 60, "feedback": "f"},
                "overall_answer_score": 60
            })
        };
        json!({
            "overall_score": 60,
            "performance_summary": "s",
            "individual_answer_assessments": [assessment(1), assessment(2)],
            "strengths": [],
            "areas_for_improvement": [],
            "next_steps": [],
            "skill_level_assessment": {}
        })
        .to_string()
    };

    let engine = engine(
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        Arc::new(FakeEvaluator::Fixed(evaluator_response)),
        Arc::new(RecordingStore::new()),
    );

    let request = EvaluationRequest::new(vec![
        TranscriptEntry::new(1, "Same question", "first answer"),
        TranscriptEntry::new(2, "Same question", "second answer"),
    ]);

    let result = engine
        .evaluate(UserId::new(), &request, &SkillSnapshot::new())
        .await
        .unwrap();

    assert_eq!(index.queries.load(Ordering::SeqCst), 1);
    // Both entries still got the shared reference
    assert!(result
        .answer_assessments
        .iter()
        .all(|a| a.reference_answer.is_some()));
}

#[tokio::test]
async fn evaluate_stored_reads_snapshot_from_store() {
    let store = Arc::new(SqliteSkillStore::open_in_memory().unwrap());
    let user = UserId::new();
    store.upsert_skill(user, "Python", 2).await.unwrap();

    let engine = engine(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEvaluator::Fixed(valid_response())),
        Arc::clone(&store) as Arc<dyn SkillStore>,
    );

    let result = engine
        .evaluate_stored(user, &EvaluationRequest::new(transcript()))
        .await
        .unwrap();

    // Stored prior of 2 clamps the proposed 5 to 3
    let snapshot = store.get_skills(user).await.unwrap();
    assert_eq!(snapshot.get("Python"), Some(&3));

    let python_delta = result
        .skill_deltas
        .iter()
        .find(|d| d.skill == "Python")
        .unwrap();
    assert_eq!(python_delta.previous, Some(2));
    assert_eq!(python_delta.stored, 3);
}

#[tokio::test]
async fn repeated_evaluation_with_same_inputs_is_deterministic() {
    let build = || {
        engine(
            Arc::new(
                FakeIndex::new()
                    .with_hit("What is a Python decorator?", "Wraps callables", 0.8)
                    .with_hit("Explain database indexing", "B-tree structures", 0.6),
            ),
            Arc::new(FakeEvaluator::Fixed(valid_response())),
            Arc::new(RecordingStore::new()),
        )
    };

    let request = EvaluationRequest::new(transcript());
    let snapshot = SkillSnapshot::new();

    let first = build()
        .evaluate(UserId::new(), &request, &snapshot)
        .await
        .unwrap();
    let second = build()
        .evaluate(UserId::new(), &request, &snapshot)
        .await
        .unwrap();

    assert_eq!(first.overall_score, second.overall_score);
    assert_eq!(first.reference_coverage, second.reference_coverage);
    assert_eq!(
        serde_json::to_value(&first.answer_assessments).unwrap(),
        serde_json::to_value(&second.answer_assessments).unwrap()
    );
}
